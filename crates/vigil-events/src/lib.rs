//! Vigil Events - durable work queue via Apache Pulsar
//!
//! Carries `ride.end` jobs from the ride coordinator to the aggregator with
//! persistent delivery, manual acknowledgement and strictly sequential
//! consumption. Retry bookkeeping rides in message properties
//! (`x-retry-count`); republish-and-ack is the retry mechanism.

mod client;
mod consumer;
mod error;
pub mod metrics;
mod publisher;

pub use client::QueueClient;
pub use consumer::JobConsumer;
pub use error::{EventError, Result};
pub use publisher::{JobPublisher, RetryConfig};

// Re-export pulsar types callers touch directly.
pub use pulsar::consumer::Message;
