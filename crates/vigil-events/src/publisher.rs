use std::collections::HashMap;
use std::time::{Duration, Instant};

use backoff::{backoff::Backoff, ExponentialBackoffBuilder};
use pulsar::producer::{Message, Producer};
use pulsar::TokioExecutor;
use tracing::{debug, error};
use vigil_common::{RideEndJob, RETRY_COUNT_PROPERTY};

use crate::{metrics, EventError, QueueClient, Result};

/// Publish retry configuration (exponential backoff).
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Producer for a durable job topic.
pub struct JobPublisher {
    producer: Producer<TokioExecutor>,
    retry_config: RetryConfig,
}

impl JobPublisher {
    /// Create a publisher bound to one topic.
    pub async fn new(queue: &QueueClient, topic: impl Into<String>) -> Result<Self> {
        let producer = queue
            .client()
            .producer()
            .with_topic(topic)
            .build()
            .await
            .map_err(|e| EventError::PublishError(e.to_string()))?;

        Ok(Self {
            producer,
            retry_config: RetryConfig::default(),
        })
    }

    /// Publish a ride-end job with the given requeue-hop count.
    ///
    /// A fresh job carries hop zero; the aggregator republishes failures
    /// with the count incremented.
    pub async fn publish_job(&mut self, job: &RideEndJob, retry_count: u32) -> Result<()> {
        let payload = serde_json::to_vec(job)?;
        let mut properties = HashMap::new();
        if retry_count > 0 {
            properties.insert(RETRY_COUNT_PROPERTY.to_string(), retry_count.to_string());
        }
        self.publish_raw(payload, properties, &job.ride_id.to_string())
            .await
    }

    /// Publish raw bytes with message properties, retrying transient send
    /// failures with bounded exponential backoff.
    pub async fn publish_raw(
        &mut self,
        payload: Vec<u8>,
        properties: HashMap<String, String>,
        label: &str,
    ) -> Result<()> {
        let start = Instant::now();

        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry_config.initial_interval)
            .with_max_interval(self.retry_config.max_interval)
            .with_multiplier(self.retry_config.multiplier)
            .with_max_elapsed_time(Some(
                self.retry_config.initial_interval * self.retry_config.max_retries,
            ))
            .build();

        let mut attempts = 0u32;
        let result = loop {
            attempts += 1;
            let send_result: Result<()> = self
                .producer
                .send_non_blocking(Message {
                    payload: payload.clone(),
                    properties: properties.clone(),
                    ..Default::default()
                })
                .await
                .map(|_| ())
                .map_err(|e| EventError::PublishError(e.to_string()));

            match send_result {
                Ok(()) => break Ok(()),
                Err(error) if attempts >= self.retry_config.max_retries => break Err(error),
                Err(_) => match backoff.next_backoff() {
                    Some(wait) => tokio::time::sleep(wait).await,
                    None => {
                        break Err(EventError::PublishError(
                            "publish retry budget exhausted".to_string(),
                        ))
                    }
                },
            }
        };

        let duration = start.elapsed().as_secs_f64();
        metrics::QueueMetrics::observe_publish_duration(duration);

        match &result {
            Ok(()) => {
                metrics::QueueMetrics::inc_published();
                debug!(job = label, duration_ms = duration * 1000.0, "job published");
            }
            Err(error) => {
                error!(job = label, %error, "failed to publish job after retries");
            }
        }

        result
    }
}
