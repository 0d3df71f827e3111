//! Upstream exchange REST clients.
//!
//! Each provider translates its native response shapes into the canonical
//! `"<BASE>-USD"` symbol form and the [`DayStats`] model. Providers never
//! cache; that is the refresh cache's job.

pub mod binance_us;
pub mod coinbase;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::error::RelayError;
use crate::types::DayStats;

pub use binance_us::BinanceUsClient;
pub use coinbase::CoinbaseClient;

/// A provider of current prices and 24h statistics for USD products.
///
/// Batch calls isolate per-symbol failures: a symbol that cannot be fetched
/// is simply absent from the returned mapping for this cycle.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Current price per requested symbol.
    async fn current_prices(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, f64>, RelayError>;

    /// 24h stats per requested symbol.
    async fn day_stats(&self, symbols: &[String]) -> Result<HashMap<String, DayStats>, RelayError>;

    /// All online USD products, in provider order.
    async fn discover_usd_products(&self) -> Result<Vec<String>, RelayError> {
        Err(RelayError::upstream(self.name(), "discovery not supported"))
    }
}

/// Ordered provider chain: the primary is attempted first and the next
/// provider only consulted on total failure (error or empty result).
pub struct SourceChain {
    sources: Vec<Box<dyn PriceSource>>,
}

impl SourceChain {
    pub fn new(sources: Vec<Box<dyn PriceSource>>) -> Self {
        Self { sources }
    }

    pub async fn current_prices(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, f64>, RelayError> {
        for source in &self.sources {
            match source.current_prices(symbols).await {
                Ok(prices) if !prices.is_empty() => return Ok(prices),
                Ok(_) => {
                    warn!(provider = source.name(), "empty price snapshot, trying next provider");
                }
                Err(error) => {
                    warn!(provider = source.name(), %error, "price fetch failed, trying next provider");
                }
            }
        }
        Err(RelayError::SnapshotEmpty)
    }

    pub async fn day_stats(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, DayStats>, RelayError> {
        for source in &self.sources {
            match source.day_stats(symbols).await {
                Ok(stats) if !stats.is_empty() => return Ok(stats),
                Ok(_) => {
                    warn!(provider = source.name(), "empty stats, trying next provider");
                }
                Err(error) => {
                    warn!(provider = source.name(), %error, "stats fetch failed, trying next provider");
                }
            }
        }
        Err(RelayError::SnapshotEmpty)
    }

    pub async fn discover_usd_products(&self) -> Result<Vec<String>, RelayError> {
        let mut last_error = RelayError::SnapshotEmpty;
        for source in &self.sources {
            match source.discover_usd_products().await {
                Ok(products) if !products.is_empty() => return Ok(products),
                Ok(_) => {
                    warn!(provider = source.name(), "empty product listing, trying next provider");
                }
                Err(error) => {
                    warn!(provider = source.name(), %error, "discovery failed, trying next provider");
                    last_error = error;
                }
            }
        }
        Err(last_error)
    }
}

/// Deserialize a numeric field the exchanges encode as a JSON string.
pub(crate) fn de_f64_str<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}
