//! Stream-processor counters. Dropped messages are cheap by design, but the
//! drop rate is the first thing to look at when live analysis goes quiet.

use prometheus::{Counter, Registry};

lazy_static::lazy_static! {
    static ref TELEMETRY_PROCESSED: Counter = Counter::new(
        "vigil_stream_telemetry_processed_total",
        "Telemetry messages that produced a buffered point"
    ).unwrap();

    static ref TELEMETRY_DROPPED: Counter = Counter::new(
        "vigil_stream_telemetry_dropped_total",
        "Telemetry messages dropped (malformed payload or failed analysis)"
    ).unwrap();

    static ref EVENTS_LOGGED: Counter = Counter::new(
        "vigil_stream_drowsiness_events_total",
        "Non-awake classifications forwarded to the coordinator"
    ).unwrap();

    static ref CRASHES_DETECTED: Counter = Counter::new(
        "vigil_stream_crashes_detected_total",
        "Impacts detected from accelerometer samples"
    ).unwrap();

    static ref BATCH_FLUSHES: Counter = Counter::new(
        "vigil_stream_batch_flushes_total",
        "Successful telemetry batch flushes"
    ).unwrap();
}

pub struct StreamMetrics {
    registry: Registry,
}

impl StreamMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        registry.register(Box::new(TELEMETRY_PROCESSED.clone())).unwrap();
        registry.register(Box::new(TELEMETRY_DROPPED.clone())).unwrap();
        registry.register(Box::new(EVENTS_LOGGED.clone())).unwrap();
        registry.register(Box::new(CRASHES_DETECTED.clone())).unwrap();
        registry.register(Box::new(BATCH_FLUSHES.clone())).unwrap();

        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn inc_processed() {
        TELEMETRY_PROCESSED.inc();
    }

    pub fn inc_dropped() {
        TELEMETRY_DROPPED.inc();
    }

    pub fn inc_event_logged() {
        EVENTS_LOGGED.inc();
    }

    pub fn inc_crash_detected() {
        CRASHES_DETECTED.inc();
    }

    pub fn inc_flush() {
        BATCH_FLUSHES.inc();
    }
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new()
    }
}
