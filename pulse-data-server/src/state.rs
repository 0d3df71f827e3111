use std::sync::Arc;

use tokio::sync::broadcast;

use pulse_data::{MarketRelay, RelayConfig, RelayError};

/// Shared application state, passed to all route handlers via
/// `axum::extract::State`.
pub struct AppState {
    pub config: RelayConfig,
    pub relay: MarketRelay,
    /// Serialised bundle updates fanned out to WebSocket subscribers.
    pub updates: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Result<Arc<Self>, RelayError> {
        let relay = MarketRelay::new(&config)?;
        let (updates, _) = broadcast::channel(config.ws_buffer);
        Ok(Arc::new(Self {
            config,
            relay,
            updates,
        }))
    }
}
