use std::time::Duration;

use pulsar::{Pulsar, TokioExecutor};
use tracing::warn;

use crate::{EventError, Result};

/// Pulsar client wrapper shared by publisher and consumer.
pub struct QueueClient {
    client: Pulsar<TokioExecutor>,
}

impl QueueClient {
    /// Connect once to the queue broker.
    ///
    /// `url` is a Pulsar service URL, e.g. `pulsar://localhost:6650`.
    pub async fn connect(url: impl Into<String>) -> Result<Self> {
        let client = Pulsar::builder(url, TokioExecutor)
            .build()
            .await
            .map_err(|e| EventError::ConnectionError(e.to_string()))?;
        Ok(Self { client })
    }

    /// Bounded connect retry loop with a fixed delay.
    ///
    /// Services call this at start-up so a queue broker that comes up a few
    /// seconds later does not kill the process; exhausting the attempts
    /// does.
    pub async fn connect_with_retry(url: &str, attempts: u32, delay: Duration) -> Result<Self> {
        let mut last_error = EventError::ConnectionError("no connect attempt made".to_string());
        for attempt in 1..=attempts {
            match Self::connect(url).await {
                Ok(client) => return Ok(client),
                Err(error) => {
                    warn!(attempt, attempts, %error, "queue connect failed");
                    last_error = error;
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(last_error)
    }

    /// Reference to the underlying Pulsar client.
    pub fn client(&self) -> &Pulsar<TokioExecutor> {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Pulsar running
    async fn test_connection() {
        QueueClient::connect("pulsar://localhost:6650")
            .await
            .expect("failed to connect to Pulsar");
    }
}
