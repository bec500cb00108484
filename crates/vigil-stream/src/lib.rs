//! Vigil stream processor
//!
//! Message-driven, per-device pipeline: consumes helmet telemetry from the
//! MQTT broker, computes HRV, classifies drowsiness against the cached
//! baseline, publishes live feedback and actuator commands, buffers
//! telemetry for batched persistence and auto-ends idle rides.
//!
//! All per-device state is owned by a single cooperative loop; handlers are
//! only ever invoked from that loop, so no locking is needed.

pub mod coordinator;
pub mod metrics;
pub mod mqtt;
pub mod processor;
pub mod state;

pub use coordinator::{CoordinatorApi, HttpCoordinator};
pub use mqtt::{FeedbackPublisher, MqttPublisher};
pub use processor::StreamProcessor;
pub use state::DeviceState;
