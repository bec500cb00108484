//! Vigil database layer
//!
//! Owns the PostgreSQL schema, the shared connection pool and every query
//! the services run. Repositories return explicit `Result`s; state-machine
//! outcomes ("already completed", "not found") are sum types rather than
//! errors so callers can branch without string matching.

mod baselines;
mod devices;
mod migrate;
mod models;
mod responders;
mod rides;
mod telemetry;

pub use baselines::BaselineRepository;
pub use devices::DeviceRepository;
pub use migrate::{
    apply_pending, ledger, load_migrations, migrations_dir, revert_last, LedgerEntry, Migration,
};
pub use models::{
    DeviceRecord, EventStats, HrStats, ResponderMatch, RideRecord, RiderInfo,
};
pub use responders::ResponderRepository;
pub use rides::{CompletionOutcome, RideCompletion, RideRepository};
pub use telemetry::TelemetryRepository;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use vigil_config::DatabaseConfig;

/// Errors surfaced by the repositories and the migration runner.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database failure (sqlx): {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O failure reading migrations: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad migration {file}: {reason}")]
    BadMigration { file: String, reason: &'static str },
}

/// Build the bounded shared pool from configuration.
///
/// Every handler acquires a connection from this pool, uses it, and returns
/// it; nothing holds a connection across idle time.
pub async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections())
        .max_connections(config.max_connections())
        .connect(config.url())
        .await?;
    Ok(pool)
}
