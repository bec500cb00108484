//! Ride coordinator entrypoint.
//!
//! Initialises telemetry, loads configuration and serves the Axum router
//! that owns ride state transitions, telemetry persistence and crash
//! handling.

mod api;
mod error;
mod state;

use std::net::SocketAddr;

use axum::Router;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use utoipa::OpenApi;
use vigil_config::{DatabaseConfig, HttpConfig, QueueConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    info!("initialising Vigil coordinator");

    let http = HttpConfig::from_env()?;
    let database = DatabaseConfig::from_env()?;
    let queue = QueueConfig::from_env()?;
    let state = AppState::new(&database, &queue).await?;

    let addr: SocketAddr = format!("{}:{}", http.host(), http.port()).parse()?;

    let openapi = api::openapi::ApiDoc::openapi();

    let app = Router::new()
        .merge(api::routes::health::router())
        .merge(api::routes::rides::router())
        .merge(api::routes::telemetry::router())
        .merge(api::routes::crash::router())
        .merge(api::routes::baseline::router())
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = TcpListener::bind(addr).await?;
    info!("starting Vigil coordinator on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vigil_coordinator=info,vigil_db=info,tower_http=info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_level(true);

    let registry = Registry::default().with(env_filter).with(fmt_layer);

    tracing::subscriber::set_global_default(registry)
        .expect("failed to initialize tracing subscriber");
}
