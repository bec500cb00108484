use futures_util::TryStreamExt;
use pulsar::consumer::{Consumer, ConsumerOptions, Message};
use pulsar::{SubType, TokioExecutor};
use vigil_common::RETRY_COUNT_PROPERTY;

use crate::{metrics, EventError, QueueClient, Result};

/// Consumer for a durable job topic.
///
/// Delivery is pulled one message at a time and acknowledged manually, so a
/// worker processes at most one job concurrently. The subscription is
/// shared: additional worker instances split the stream without
/// re-delivering acknowledged jobs.
pub struct JobConsumer {
    consumer: Consumer<Vec<u8>, TokioExecutor>,
}

impl JobConsumer {
    pub async fn new(
        queue: &QueueClient,
        topic: impl Into<String>,
        subscription: impl Into<String>,
    ) -> Result<Self> {
        let consumer = queue
            .client()
            .consumer()
            .with_topic(topic)
            .with_subscription(subscription)
            .with_subscription_type(SubType::Shared)
            .with_options(ConsumerOptions::default())
            .build()
            .await
            .map_err(|e| EventError::SubscribeError(e.to_string()))?;

        Ok(Self { consumer })
    }

    /// Next message, or `None` when the stream closes.
    pub async fn next(&mut self) -> Result<Option<Message<Vec<u8>>>> {
        let message = self.consumer.try_next().await?;
        if message.is_some() {
            metrics::QueueMetrics::inc_consumed();
        }
        Ok(message)
    }

    /// Acknowledge a delivery. Every branch of job handling ends here; a
    /// job that must run again is republished first.
    pub async fn ack(&mut self, message: &Message<Vec<u8>>) -> Result<()> {
        self.consumer
            .ack(message)
            .await
            .map_err(|e| EventError::SubscribeError(e.to_string()))
    }

    /// Requeue-hop count carried in the message properties; absent means
    /// zero.
    pub fn retry_count(message: &Message<Vec<u8>>) -> u32 {
        message
            .payload
            .metadata
            .properties
            .iter()
            .find(|kv| kv.key == RETRY_COUNT_PROPERTY)
            .and_then(|kv| kv.value.parse().ok())
            .unwrap_or(0)
    }
}
