//! Core data model shared by the history store, aggregator, and server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single `(time, value)` observation for one symbol. Immutable once
/// appended to a history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// 24h product statistics as reported by an upstream provider.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayStats {
    pub open: f64,
    pub last: f64,
    pub volume: f64,
}

/// Price move over the configured look-back window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalMove {
    /// Canonical `"<BASE>-USD"` product id, e.g. `"BTC-USD"`.
    pub symbol: String,
    pub current: f64,
    pub change_pct: f64,
}

/// Volume-significance entry for the banner view.
///
/// `volume_change_pct` is an ESTIMATE: the upstream APIs expose 24h totals
/// only, so short-term volume change is proxied from 24h price volatility
/// (see [`crate::aggregate`]). It must not be read as a measured delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeSignal {
    pub symbol: String,
    pub volume_change_pct: f64,
    pub volume: f64,
}

/// The full republished result set, replaced wholesale on every refresh.
/// Readers always observe either a complete bundle or none at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBundle {
    pub gainers: Vec<IntervalMove>,
    pub losers: Vec<IntervalMove>,
    pub top24h: Vec<IntervalMove>,
    pub banner: Vec<VolumeSignal>,
    pub updated_at: DateTime<Utc>,
    /// Symbols present in the snapshot this bundle was derived from.
    pub symbol_count: usize,
}
