//! Schema migration CLI for the Vigil database.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use vigil_db::{apply_pending, ledger, migrations_dir, revert_last};

#[derive(Parser, Debug)]
#[command(
    name = "migrate",
    version,
    about = "Apply or revert the Vigil PostgreSQL schema"
)]
struct Args {
    /// What to do with the schema.
    #[arg(value_enum, default_value = "status")]
    action: Action,

    /// PostgreSQL connection URL.
    #[arg(long, env = "DB_URL")]
    db_url: String,

    /// Directory holding the .sql migration files.
    #[arg(long, default_value_os_t = migrations_dir())]
    dir: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Action {
    /// Apply every pending migration.
    Up,
    /// Revert the most recently applied migration.
    Down,
    /// List known migrations and when they ran.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&args.db_url)
        .await?;

    match args.action {
        Action::Up => {
            let ran = apply_pending(&pool, &args.dir).await?;
            if ran.is_empty() {
                println!("schema is up to date");
            }
            for name in ran {
                println!("applied {name}");
            }
        }
        Action::Down => match revert_last(&pool, &args.dir).await? {
            Some(name) => println!("reverted {name}"),
            None => println!("nothing to revert"),
        },
        Action::Status => {
            for entry in ledger(&pool, &args.dir).await? {
                match entry.run_at {
                    Some(run_at) => println!("applied  {}  ({})", entry.name, run_at.to_rfc3339()),
                    None => println!("pending  {}", entry.name),
                }
            }
        }
    }

    Ok(())
}
