use prometheus::{Counter, Histogram, HistogramOpts, Registry};

lazy_static::lazy_static! {
    static ref JOBS_PUBLISHED: Counter = Counter::new(
        "vigil_queue_jobs_published_total",
        "Total number of jobs published to the work queue"
    ).unwrap();

    static ref JOBS_CONSUMED: Counter = Counter::new(
        "vigil_queue_jobs_consumed_total",
        "Total number of jobs pulled from the work queue"
    ).unwrap();

    static ref JOBS_DISCARDED: Counter = Counter::new(
        "vigil_queue_jobs_discarded_total",
        "Jobs dropped as poison or invalid"
    ).unwrap();

    static ref PUBLISH_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "vigil_queue_publish_duration_seconds",
            "Job publish duration"
        )
    ).unwrap();
}

/// Work-queue metrics registry.
pub struct QueueMetrics {
    registry: Registry,
}

impl QueueMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        registry.register(Box::new(JOBS_PUBLISHED.clone())).unwrap();
        registry.register(Box::new(JOBS_CONSUMED.clone())).unwrap();
        registry.register(Box::new(JOBS_DISCARDED.clone())).unwrap();
        registry.register(Box::new(PUBLISH_DURATION.clone())).unwrap();

        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn inc_published() {
        JOBS_PUBLISHED.inc();
    }

    pub fn inc_consumed() {
        JOBS_CONSUMED.inc();
    }

    pub fn inc_discarded() {
        JOBS_DISCARDED.inc();
    }

    pub fn observe_publish_duration(seconds: f64) {
        PUBLISH_DURATION.observe(seconds);
    }
}

impl Default for QueueMetrics {
    fn default() -> Self {
        Self::new()
    }
}
