//! Broker plumbing: connection options and the outbound publish seam.

use std::sync::Arc;

use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use vigil_config::BrokerConfig;

/// Outbound feedback channel back to device and app.
#[async_trait]
pub trait FeedbackPublisher: Send + Sync {
    /// Publish a JSON payload at QoS 1.
    async fn publish_json(&self, topic: &str, payload: Vec<u8>) -> anyhow::Result<()>;
}

#[async_trait]
impl<T: FeedbackPublisher + ?Sized> FeedbackPublisher for Arc<T> {
    async fn publish_json(&self, topic: &str, payload: Vec<u8>) -> anyhow::Result<()> {
        T::publish_json(self, topic, payload).await
    }
}

/// rumqttc-backed publisher.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedbackPublisher for MqttPublisher {
    async fn publish_json(&self, topic: &str, payload: Vec<u8>) -> anyhow::Result<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await?;
        Ok(())
    }
}

/// Build the MQTT client and its event loop from configuration.
pub fn connect(config: &BrokerConfig, client_id: &str) -> (AsyncClient, EventLoop) {
    let mut options = MqttOptions::new(client_id, config.host(), config.port());
    options.set_keep_alive(std::time::Duration::from_secs(30));
    if let Some((user, pass)) = config.credentials() {
        options.set_credentials(user, pass);
    }
    AsyncClient::new(options, 64)
}
