mod handlers;
mod routes;

use anyhow::{Context, Result};
use autosolve_common::config::SolverConfig;
use autosolve_engine::BatchRunner;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub runner: BatchRunner,
    pub batch_timeout: Duration,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new().merge(routes::routes()).with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber; LOG_FORMAT=json for structured output
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    info!("Autosolve API booting...");

    let config = SolverConfig::load_default().context("Failed to load solver config")?;
    let runner = BatchRunner::from_config(&config).context("Failed to build batch runner")?;

    let state = Arc::new(AppState {
        runner,
        batch_timeout: Duration::from_secs(config.server.batch_timeout_secs),
    });

    let addr = config.server.bind_addr.as_str();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        addr = %addr,
        sandbox = %config.sandbox.backend,
        batch_timeout_secs = config.server.batch_timeout_secs,
        "HTTP server listening"
    );

    axum::serve(listener, app(state)).await.context("Server error")?;
    Ok(())
}
