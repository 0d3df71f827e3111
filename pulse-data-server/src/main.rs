mod error;
mod publisher;
mod routes;
mod state;
mod ws;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pulse_data::RelayConfig;
use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RelayConfig::from_env();
    info!(?config, "starting pulse-data server");

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(err) => {
            error!(%err, "failed to initialise relay");
            return;
        }
    };

    // Background refresh + push driver.
    publisher::spawn(state.clone());

    let app = Router::new()
        .route("/top-gainers", get(routes::top_gainers))
        .route("/top-losers", get(routes::top_losers))
        .route("/top-24h", get(routes::top_24h))
        .route("/banner", get(routes::banner))
        .route("/data", get(routes::data))
        .route("/health", get(routes::health))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let addr = state.config.bind;
    info!("pulse-data server listening on http://{addr}");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%err, %addr, "failed to bind listen address");
            return;
        }
    };

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(%err, "server terminated with error");
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to install Ctrl+C handler");
        return;
    }
    info!("shutdown signal received, stopping");
}
