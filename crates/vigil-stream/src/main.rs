//! Stream processor entrypoint.
//!
//! Connects to the device broker with a bounded retry loop, subscribes to
//! the helmet wildcard topics, and drives the per-device pipeline from a
//! single cooperative loop alongside the ride-timeout sweep.

use std::time::Duration;

use anyhow::bail;
use rumqttc::{AsyncClient, Event, EventLoop, Packet, QoS};
use tracing::{info, warn};
use vigil_common::topics::{ACCEL_FILTER, BASELINE_FILTER, TELEMETRY_FILTER};
use vigil_config::{
    BrokerConfig, CoordinatorConfig, StreamConfig, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY,
};
use vigil_stream::{HttpCoordinator, MqttPublisher, StreamProcessor};

/// Cadence of the ride-timeout sweep.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    info!("initialising Vigil stream processor");

    let broker = BrokerConfig::from_env()?;
    let coordinator_config = CoordinatorConfig::from_env()?;
    let stream_config = StreamConfig::from_env()?;

    info!(
        broker = %format!("{}:{}", broker.host(), broker.port()),
        coordinator = coordinator_config.base_url(),
        flush_interval_secs = stream_config.flush_interval().as_secs(),
        ride_timeout_secs = stream_config.ride_timeout().as_secs(),
        "configuration loaded"
    );

    let (client, eventloop) = vigil_stream::mqtt::connect(&broker, "vigil-stream");
    let coordinator = HttpCoordinator::new(&coordinator_config)?;
    let publisher = MqttPublisher::new(client.clone());
    let processor = StreamProcessor::new(coordinator, publisher, stream_config);

    run(client, eventloop, processor).await
}

async fn run(
    client: AsyncClient,
    mut eventloop: EventLoop,
    mut processor: StreamProcessor<HttpCoordinator, MqttPublisher>,
) -> anyhow::Result<()> {
    let mut sweep = tokio::time::interval(SWEEP_INTERVAL);
    let mut connect_failures = 0u32;

    loop {
        tokio::select! {
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    connect_failures = 0;
                    info!("connected to broker; subscribing to helmet topics");
                    client.subscribe(TELEMETRY_FILTER, QoS::AtLeastOnce).await?;
                    client.subscribe(BASELINE_FILTER, QoS::AtLeastOnce).await?;
                    client.subscribe(ACCEL_FILTER, QoS::AtLeastOnce).await?;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    processor.handle_publish(&publish.topic, &publish.payload).await;
                }
                Ok(_) => {}
                Err(error) => {
                    connect_failures += 1;
                    if connect_failures >= CONNECT_ATTEMPTS {
                        bail!("broker unreachable after {connect_failures} attempts: {error}");
                    }
                    warn!(
                        attempt = connect_failures,
                        attempts = CONNECT_ATTEMPTS,
                        %error,
                        "broker connection error; retrying"
                    );
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
            },
            _ = sweep.tick() => {
                processor.sweep_idle_rides().await;
            }
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vigil_stream=info,rumqttc=warn"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_level(true);

    let registry = Registry::default().with(env_filter).with(fmt_layer);

    tracing::subscriber::set_global_default(registry)
        .expect("failed to initialize tracing subscriber");
}
