//! Per-device in-memory state.

use std::time::Instant;

use uuid::Uuid;
use vigil_common::TelemetryPoint;
use vigil_hrv::BaselineMetrics;

/// Everything the processor remembers about one device between messages.
///
/// Owned exclusively by the processor loop; evicted wholesale when the
/// device's ride times out.
#[derive(Debug)]
pub struct DeviceState {
    /// Cached calibration baseline, overwritten on every baseline message.
    pub baseline: Option<BaselineMetrics>,
    /// Telemetry accepted since the last successful flush, in capture order.
    pub buffer: Vec<TelemetryPoint>,
    /// The ride this device's telemetry attaches to, if one is open.
    pub ride_id: Option<Uuid>,
    /// Last successful (or initial) flush instant.
    pub last_flush: Instant,
    /// Last accepted telemetry instant; drives ride auto-end.
    pub last_activity: Instant,
}

impl DeviceState {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            baseline: None,
            buffer: Vec::new(),
            ride_id: None,
            last_flush: now,
            last_activity: now,
        }
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}
