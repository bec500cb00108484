//! Common domain types shared across Vigil crates
//!
//! Home of everything both sides of a wire need to agree on: ride and
//! drowsiness state enums, broker payload shapes, topic naming, and the
//! `ride.end` job that travels over the work queue.

pub mod queue;
pub mod rpc;
pub mod topics;
pub mod types;
pub mod wire;

pub use queue::{RideEndJob, RETRY_COUNT_PROPERTY, RIDE_END_TOPIC};
pub use rpc::TelemetryPoint;
pub use topics::{device_topic, parse_device_topic, DeviceChannel};
pub use types::{CrashSeverity, DrowsinessStatus, RideStatus};
pub use wire::{
    AccelMessage, AccelSnapshot, CommandMessage, CrashMessage, CrashReport, GeoPoint,
    LiveAnalysis, LiveMetrics, RiderContact, TelemetryMessage,
};
