//! OIDC Auth Gateway
//!
//! Single-binary service that:
//! 1. Loads provider configuration (TOML + env overlay)
//! 2. Listens for the four auth actions (login, callback, status, reset)
//! 3. Delegates all verification to the oidc-verify core
//! 4. Exposes /health and Prometheus /metrics

mod config;
mod metrics;
mod service;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::service::{
    AppState, SessionMap, callback_handler, health_handler, login_handler, metrics_handler,
    reset_handler, status_handler,
};

/// Hard bound on outbound provider calls; mirrors the core's own default.
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the axum router with all routes and shared state.
///
/// Applies a concurrency limit layer based on `max_connections`.
fn build_router(state: AppState, max_connections: usize) -> Router {
    Router::new()
        .route("/auth/login", get(login_handler))
        .route("/auth/callback", get(callback_handler))
        .route("/auth/status", get(status_handler))
        .route("/auth/reset", post(reset_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting oidc-auth-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.gateway.listen_addr,
        issuer = %config.provider.issuer,
        client_id = %config.provider.client_id,
        "configuration loaded"
    );

    let http = reqwest::Client::builder()
        .timeout(OUTBOUND_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    let state = AppState {
        provider: config.provider_config(),
        http,
        sessions: Arc::new(SessionMap::new()),
        post_login_redirect: config.gateway.post_login_redirect.clone(),
        prometheus,
    };

    let router = build_router(state, config.gateway.max_connections);

    let listener = TcpListener::bind(config.gateway.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.gateway.listen_addr))?;
    info!(addr = %config.gateway.listen_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("oidc-auth-gateway stopped");
    Ok(())
}
