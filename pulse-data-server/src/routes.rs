//! HTTP pull surface.
//!
//! Handlers read the cached bundle; a fresh cache entry costs no upstream
//! call, a stale one triggers at most one recompute across all concurrent
//! requests. Cold start (nothing computed yet) yields 503, total pipeline
//! failure 500 - both as `{"error": "..."}` JSON.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde_json::{Value, json};

use pulse_data::{IntervalMove, MarketBundle, VolumeSignal};

use crate::error::ApiError;
use crate::state::AppState;

async fn bundle(state: &AppState) -> Result<MarketBundle, ApiError> {
    state.relay.bundle(Utc::now()).await.map_err(ApiError::from)
}

/// Top movers with positive window change, strongest first.
pub async fn top_gainers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<IntervalMove>>, ApiError> {
    Ok(Json(bundle(&state).await?.gainers))
}

/// Top movers with negative window change, most negative first.
pub async fn top_losers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<IntervalMove>>, ApiError> {
    Ok(Json(bundle(&state).await?.losers))
}

/// Most volatile symbols by absolute window change.
pub async fn top_24h(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<IntervalMove>>, ApiError> {
    Ok(Json(bundle(&state).await?.top24h))
}

/// Volume-significant symbols. `volume_change_pct` is an estimate derived
/// from 24h volatility, not a measured volume delta.
pub async fn banner(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<VolumeSignal>>, ApiError> {
    Ok(Json(bundle(&state).await?.banner))
}

/// The full bundle: all views plus `updated_at` / `symbol_count` metadata.
pub async fn data(State(state): State<Arc<AppState>>) -> Result<Json<MarketBundle>, ApiError> {
    Ok(Json(bundle(&state).await?))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
