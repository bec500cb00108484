//! Vigil configuration - centralized environment-backed settings
//!
//! Every service loads its section here instead of reading scattered env
//! vars. `.env` files are honoured when present (via dotenvy in the binary
//! entrypoints); all values have production defaults except the database
//! URL, which must be set explicitly.

use std::time::Duration;

use anyhow::{Context, Result};
use config::Environment;

fn settings() -> Result<config::Config> {
    config::Config::builder()
        .add_source(Environment::default().try_parsing(true))
        .build()
        .context("failed to build configuration from environment")
}

/// PostgreSQL connection settings shared by the coordinator, the aggregator
/// and the migration runner.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    url: String,
    min_connections: u32,
    max_connections: u32,
}

impl DatabaseConfig {
    /// Loads from `DB_URL` (required), `DB_MIN_CONNECTIONS`, `DB_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self> {
        let settings = settings()?;

        let url = settings
            .get_string("DB_URL")
            .context("set DB_URL with the PostgreSQL connection string")?;

        let min_connections = settings
            .get_int("DB_MIN_CONNECTIONS")
            .map(|value| value.max(1) as u32)
            .unwrap_or(1);

        let max_connections = settings
            .get_int("DB_MAX_CONNECTIONS")
            .map(|value| value.max(1) as u32)
            .unwrap_or(5);

        Ok(Self {
            url,
            min_connections,
            max_connections,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Lower bound of the shared pool.
    pub fn min_connections(&self) -> u32 {
        self.min_connections
    }

    /// Upper bound of the shared pool.
    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }
}

/// MQTT broker settings for the stream processor.
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    url: String,
    username: Option<String>,
    password: Option<String>,
}

impl BrokerConfig {
    /// Loads from `BROKER_URL`, `BROKER_USER`, `BROKER_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let settings = settings()?;

        let url = settings
            .get_string("BROKER_URL")
            .unwrap_or_else(|_| "mqtt://localhost:1883".to_string());
        let username = settings.get_string("BROKER_USER").ok();
        let password = settings.get_string("BROKER_PASSWORD").ok();

        Ok(Self {
            url,
            username,
            password,
        })
    }

    /// Broker hostname, with any `mqtt://` / `tcp://` scheme stripped.
    pub fn host(&self) -> String {
        host_port_of(&self.url).0
    }

    /// Broker TCP port (default 1883).
    pub fn port(&self) -> u16 {
        host_port_of(&self.url).1
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

fn host_port_of(url: &str) -> (String, u16) {
    let trimmed = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    match trimmed.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (trimmed.to_string(), 1883),
        },
        None => (trimmed.to_string(), 1883),
    }
}

/// Work-queue (Pulsar) settings shared by the coordinator and aggregator.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    url: String,
}

impl QueueConfig {
    /// Loads from `QUEUE_URL`.
    pub fn from_env() -> Result<Self> {
        let settings = settings()?;
        let url = settings
            .get_string("QUEUE_URL")
            .unwrap_or_else(|_| "pulsar://localhost:6650".to_string());
        Ok(Self { url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Coordinator RPC endpoint as seen from the stream processor.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    base_url: String,
}

impl CoordinatorConfig {
    /// Loads from `COORDINATOR_URL`.
    pub fn from_env() -> Result<Self> {
        let settings = settings()?;
        let base_url = settings
            .get_string("COORDINATOR_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Timeout for short RPCs (start ride, log event).
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Timeout for batch flush and crash reporting.
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }
}

/// HTTP binding for the coordinator service.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    host: String,
    port: u16,
}

impl HttpConfig {
    /// Loads from `HOST` / `PORT`.
    pub fn from_env() -> Result<Self> {
        let settings = settings()?;

        let host = settings
            .get_string("HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = settings
            .get_int("PORT")
            .map(|value| value as u16)
            .unwrap_or(8000);

        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Stream-processor tunables.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    flush_interval: Duration,
    ride_timeout: Duration,
    crash_g_threshold: f64,
    crash_vector_threshold: f64,
}

impl StreamConfig {
    /// Explicit construction, used by tests and embedded tooling.
    pub fn new(
        flush_interval: Duration,
        ride_timeout: Duration,
        crash_g_threshold: f64,
        crash_vector_threshold: f64,
    ) -> Self {
        Self {
            flush_interval,
            ride_timeout,
            crash_g_threshold,
            crash_vector_threshold,
        }
    }

    /// Loads from `FLUSH_INTERVAL_SECONDS`, `RIDE_TIMEOUT_SECONDS`,
    /// `CRASH_G_THRESHOLD`, `CRASH_VECTOR_THRESHOLD`.
    pub fn from_env() -> Result<Self> {
        let settings = settings()?;

        let flush_interval = settings
            .get_int("FLUSH_INTERVAL_SECONDS")
            .map(|value| Duration::from_secs(value.max(1) as u64))
            .unwrap_or(Duration::from_secs(120));

        let ride_timeout = settings
            .get_int("RIDE_TIMEOUT_SECONDS")
            .map(|value| Duration::from_secs(value.max(1) as u64))
            .unwrap_or(Duration::from_secs(60));

        let crash_g_threshold = settings.get_float("CRASH_G_THRESHOLD").unwrap_or(4.0);
        let crash_vector_threshold = settings.get_float("CRASH_VECTOR_THRESHOLD").unwrap_or(6.0);

        Ok(Self {
            flush_interval,
            ride_timeout,
            crash_g_threshold,
            crash_vector_threshold,
        })
    }

    /// Elapsed time after which a device's telemetry buffer is flushed.
    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Inactivity window after which a ride is auto-ended.
    pub fn ride_timeout(&self) -> Duration {
        self.ride_timeout
    }

    /// Per-axis gravity-compensated acceleration above which an impact is
    /// declared (G).
    pub fn crash_g_threshold(&self) -> f64 {
        self.crash_g_threshold
    }

    /// Vector-magnitude excess over rest gravity above which an impact is
    /// declared (G).
    pub fn crash_vector_threshold(&self) -> f64 {
        self.crash_vector_threshold
    }
}

/// Aggregator tunables.
#[derive(Clone, Debug)]
pub struct AggregatorConfig {
    max_retries: u32,
}

impl AggregatorConfig {
    /// Loads from `MAX_RETRIES`.
    pub fn from_env() -> Result<Self> {
        let settings = settings()?;
        let max_retries = settings
            .get_int("MAX_RETRIES")
            .map(|value| value.max(0) as u32)
            .unwrap_or(3);
        Ok(Self { max_retries })
    }

    /// Requeue hops after which a failing job is discarded as poison.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Bounded retry loop parameters used for broker and queue connects.
pub const CONNECT_ATTEMPTS: u32 = 30;
/// Fixed delay between connect attempts.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_url_parsing_strips_scheme() {
        assert_eq!(host_port_of("mqtt://broker:1884"), ("broker".to_string(), 1884));
        assert_eq!(host_port_of("tcp://10.0.0.5:1883"), ("10.0.0.5".to_string(), 1883));
        assert_eq!(host_port_of("broker.local"), ("broker.local".to_string(), 1883));
        assert_eq!(host_port_of("broker.local:2000"), ("broker.local".to_string(), 2000));
    }

    #[test]
    fn broker_url_with_bad_port_falls_back() {
        assert_eq!(host_port_of("mqtt://broker:xyz"), ("broker:xyz".to_string(), 1883));
    }
}
