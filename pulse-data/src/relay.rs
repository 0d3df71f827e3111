//! The relay pipeline: fetch -> aggregate -> format, fronted by the
//! refresh cache.
//!
//! All mutable state (histories, cached bundle) is owned here and guarded;
//! the publisher task and request handlers share one `MarketRelay` behind
//! an `Arc` and never touch raw shared structures.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::aggregate::IntervalAggregator;
use crate::cache::RefreshCache;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::exchange::{BinanceUsClient, CoinbaseClient, PriceSource, SourceChain};
use crate::types::MarketBundle;

pub struct MarketRelay {
    sources: SourceChain,
    aggregator: Mutex<IntervalAggregator>,
    cache: RefreshCache,
    symbols: Vec<String>,
    max_symbols: usize,
}

impl MarketRelay {
    /// Build the relay with the default Coinbase -> Binance.US provider
    /// chain.
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let coinbase = CoinbaseClient::new(
            config.http_timeout,
            config.discovery_timeout,
            config.fetch_delay,
        )?;
        let binance = BinanceUsClient::new(config.http_timeout)?;
        Ok(Self::with_sources(
            config,
            vec![Box::new(coinbase), Box::new(binance)],
        ))
    }

    /// Build the relay over an explicit provider chain.
    pub fn with_sources(config: &RelayConfig, sources: Vec<Box<dyn PriceSource>>) -> Self {
        Self {
            sources: SourceChain::new(sources),
            aggregator: Mutex::new(IntervalAggregator::new(
                config.history_capacity,
                config.window,
            )),
            cache: RefreshCache::new(config.cache_ttl),
            symbols: config.symbols.clone(),
            max_symbols: config.max_symbols,
        }
    }

    /// Latest bundle via the cache: fresh entries are served without any
    /// upstream call, stale entries trigger a single-flight recompute.
    pub async fn bundle(&self, now: DateTime<Utc>) -> Result<MarketBundle, RelayError> {
        self.cache.get_or_compute(now, || self.compute(now)).await
    }

    /// Recompute unconditionally and replace the cached bundle. Used by the
    /// periodic publisher, independent of cache staleness.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<MarketBundle, RelayError> {
        let bundle = self.compute(now).await?;
        self.cache.store(bundle.clone(), now);
        Ok(bundle)
    }

    /// Last good bundle regardless of age, if any. Used for subscriber
    /// first paint.
    pub fn cached(&self) -> Option<MarketBundle> {
        self.cache.peek()
    }

    /// Tracked products for this cycle: the configured list, or provider
    /// discovery when none is configured. Capped to the batch limit either
    /// way.
    async fn universe(&self) -> Result<Vec<String>, RelayError> {
        let mut symbols = if self.symbols.is_empty() {
            self.sources.discover_usd_products().await?
        } else {
            self.symbols.clone()
        };
        symbols.truncate(self.max_symbols);
        Ok(symbols)
    }

    async fn compute(&self, now: DateTime<Utc>) -> Result<MarketBundle, RelayError> {
        let symbols = self.universe().await?;
        let prices = self.sources.current_prices(&symbols).await?;

        // Stats drive the banner only; a failed stats fetch degrades the
        // bundle rather than failing the cycle.
        let stats = match self.sources.day_stats(&symbols).await {
            Ok(stats) => stats,
            Err(error) => {
                warn!(%error, "stats fetch failed, banner will be empty this cycle");
                HashMap::new()
            }
        };

        let mut aggregator = self.aggregator.lock().await;
        let bundle = aggregator.refresh(&prices, &stats, now);
        debug!(
            symbols = bundle.symbol_count,
            gainers = bundle.gainers.len(),
            losers = bundle.losers.len(),
            "computed market bundle"
        );
        Ok(bundle)
    }
}
