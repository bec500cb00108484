//! Shared application state for the Axum handlers.

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::info;
use vigil_common::{RideEndJob, RIDE_END_TOPIC};
use vigil_config::{DatabaseConfig, QueueConfig, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY};
use vigil_events::{JobPublisher, QueueClient};

/// Immutable state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    publisher: Arc<Mutex<JobPublisher>>,
}

impl AppState {
    /// Initialise the pool and the work-queue producer from configuration.
    pub async fn new(database: &DatabaseConfig, queue: &QueueConfig) -> anyhow::Result<Self> {
        let pool = vigil_db::connect_pool(database)
            .await
            .with_context(|| "failed to initialise PostgreSQL pool")?;

        let queue_client =
            QueueClient::connect_with_retry(queue.url(), CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY)
                .await
                .with_context(|| format!("failed to connect to work queue at {}", queue.url()))?;

        let publisher = JobPublisher::new(&queue_client, RIDE_END_TOPIC)
            .await
            .with_context(|| "failed to create ride.end publisher")?;

        info!(queue = queue.url(), "coordinator state initialised");

        Ok(Self {
            pool,
            publisher: Arc::new(Mutex::new(publisher)),
        })
    }

    /// Publish a ride-end job with persistent delivery.
    pub async fn publish_ride_end(&self, job: &RideEndJob) -> vigil_events::Result<()> {
        self.publisher.lock().await.publish_job(job, 0).await
    }
}
