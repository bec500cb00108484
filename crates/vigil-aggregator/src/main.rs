//! Ride aggregator entrypoint.
//!
//! Long-running consumer of the `ride.end` queue. Strictly one job in
//! flight per instance: receive, process, acknowledge, repeat. Horizontal
//! instances are safe because finalisation is serialised by a row lock in
//! the database, not by the queue.

mod worker;

use tracing::{error, info, warn};
use vigil_common::{RideEndJob, RIDE_END_TOPIC};
use vigil_config::{
    AggregatorConfig, DatabaseConfig, QueueConfig, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY,
};
use vigil_events::{metrics::QueueMetrics, JobConsumer, JobPublisher, QueueClient};
use worker::{disposition_for, process_ride, Disposition};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    info!("initialising Vigil ride aggregator");

    let database = DatabaseConfig::from_env()?;
    let queue = QueueConfig::from_env()?;
    let aggregator = AggregatorConfig::from_env()?;

    let pool = vigil_db::connect_pool(&database).await?;
    let queue_client =
        QueueClient::connect_with_retry(queue.url(), CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY).await?;
    let mut consumer = JobConsumer::new(&queue_client, RIDE_END_TOPIC, "ride-aggregator").await?;
    let mut publisher = JobPublisher::new(&queue_client, RIDE_END_TOPIC).await?;

    info!(
        queue = queue.url(),
        max_retries = aggregator.max_retries(),
        "consuming from {RIDE_END_TOPIC}"
    );

    while let Some(message) = consumer.next().await? {
        let retry_count = JobConsumer::retry_count(&message);

        let job: RideEndJob = match serde_json::from_slice(&message.payload.data) {
            Ok(job) => job,
            Err(parse_error) => {
                error!(%parse_error, "invalid job payload; discarding");
                QueueMetrics::inc_discarded();
                consumer.ack(&message).await?;
                continue;
            }
        };

        info!(ride_id = %job.ride_id, retry_count, "processing ride.end job");
        let outcome = process_ride(&pool, &job).await;

        match disposition_for(&outcome, retry_count, aggregator.max_retries()) {
            Disposition::Ack => {
                consumer.ack(&message).await?;
            }
            Disposition::AckDiscard => {
                warn!(ride_id = %job.ride_id, retry_count, ?outcome, "discarding job");
                QueueMetrics::inc_discarded();
                consumer.ack(&message).await?;
            }
            Disposition::Republish { next_retry } => {
                warn!(
                    ride_id = %job.ride_id,
                    retry = next_retry,
                    max = aggregator.max_retries(),
                    "requeueing failed job"
                );
                match publisher.publish_job(&job, next_retry).await {
                    Ok(()) => consumer.ack(&message).await?,
                    Err(publish_error) => {
                        // Leave the delivery unacknowledged; the broker
                        // redelivers it and the retry count is unchanged.
                        error!(ride_id = %job.ride_id, %publish_error, "requeue publish failed");
                    }
                }
            }
        }
    }

    info!("queue stream closed; shutting down");
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vigil_aggregator=info,vigil_db=info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_level(true);

    let registry = Registry::default().with(env_filter).with(fmt_layer);

    tracing::subscriber::set_global_default(registry)
        .expect("failed to initialize tracing subscriber");
}
