//! Time-based refresh cache fronting the fetch -> aggregate -> format
//! pipeline.
//!
//! One logical entry process-wide: the latest [`MarketBundle`], replaced
//! wholesale. While the entry is fresh, reads cost nothing upstream. When it
//! goes stale, exactly one caller recomputes; everyone else keeps being
//! served the last good payload instead of piling up behind the refresh.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::RelayError;
use crate::types::MarketBundle;

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: MarketBundle,
    computed_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct RefreshCache {
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
    /// Single-flight gate: `try_lock` keeps concurrent staleness triggers
    /// from fanning out into redundant upstream bursts.
    refresh_gate: Mutex<()>,
}

impl RefreshCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Last good payload regardless of age, if any.
    pub fn peek(&self) -> Option<MarketBundle> {
        self.entry.read().as_ref().map(|e| e.payload.clone())
    }

    /// Replace the cached payload wholesale.
    pub fn store(&self, payload: MarketBundle, computed_at: DateTime<Utc>) {
        *self.entry.write() = Some(CacheEntry {
            payload,
            computed_at,
        });
    }

    fn fresh_payload(&self, now: DateTime<Utc>) -> Option<MarketBundle> {
        self.entry
            .read()
            .as_ref()
            .filter(|e| now - e.computed_at < self.ttl)
            .map(|e| e.payload.clone())
    }

    /// Serve the cached payload while fresh; otherwise recompute at most
    /// once across concurrent callers.
    ///
    /// Callers that find a recompute already in flight are handed the stale
    /// payload immediately rather than waiting on the upstream round-trip.
    /// A failed recompute also falls back to the last good payload; only a
    /// cold cache with no payload at all yields [`RelayError::NotReady`].
    pub async fn get_or_compute<F, Fut>(
        &self,
        now: DateTime<Utc>,
        compute: F,
    ) -> Result<MarketBundle, RelayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MarketBundle, RelayError>>,
    {
        if let Some(payload) = self.fresh_payload(now) {
            return Ok(payload);
        }

        let Ok(_guard) = self.refresh_gate.try_lock() else {
            return self.peek().ok_or(RelayError::NotReady);
        };

        // The previous gate holder may have refreshed while we waited on
        // the freshness check above.
        if let Some(payload) = self.fresh_payload(now) {
            return Ok(payload);
        }

        match compute().await {
            Ok(payload) => {
                self.store(payload.clone(), now);
                Ok(payload)
            }
            Err(error) => {
                warn!(%error, "refresh failed, serving last good payload");
                self.peek().ok_or(RelayError::NotReady)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn bundle(symbol_count: usize, at: DateTime<Utc>) -> MarketBundle {
        MarketBundle {
            gainers: Vec::new(),
            losers: Vec::new(),
            top24h: Vec::new(),
            banner: Vec::new(),
            updated_at: at,
            symbol_count,
        }
    }

    #[tokio::test]
    async fn test_fresh_read_skips_recompute() {
        let cache = RefreshCache::new(Duration::seconds(60));
        let calls = AtomicUsize::new(0);

        let first = cache
            .get_or_compute(t0(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(bundle(1, t0())) }
            })
            .await
            .unwrap();

        let second = cache
            .get_or_compute(t0() + Duration::seconds(10), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(bundle(2, t0())) }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_stale_read_recomputes() {
        let cache = RefreshCache::new(Duration::seconds(60));
        cache.store(bundle(1, t0()), t0());

        let now = t0() + Duration::seconds(61);
        let refreshed = cache
            .get_or_compute(now, || async move { Ok(bundle(2, now)) })
            .await
            .unwrap();
        assert_eq!(refreshed.symbol_count, 2);
    }

    #[tokio::test]
    async fn test_failed_recompute_serves_last_good() {
        let cache = RefreshCache::new(Duration::seconds(60));
        cache.store(bundle(1, t0()), t0());

        let now = t0() + Duration::seconds(120);
        let served = cache
            .get_or_compute(now, || async { Err(RelayError::SnapshotEmpty) })
            .await
            .unwrap();
        assert_eq!(served.symbol_count, 1);
    }

    #[tokio::test]
    async fn test_cold_cache_failure_is_not_ready() {
        let cache = RefreshCache::new(Duration::seconds(60));
        let result = cache
            .get_or_compute(t0(), || async { Err(RelayError::SnapshotEmpty) })
            .await;
        assert!(matches!(result, Err(RelayError::NotReady)));
    }

    #[tokio::test]
    async fn test_single_flight_losers_get_stale_payload() {
        let cache = RefreshCache::new(Duration::seconds(60));
        cache.store(bundle(1, t0()), t0());

        let now = t0() + Duration::seconds(120);
        let calls = AtomicUsize::new(0);

        let winner = cache.get_or_compute(now, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                Ok(bundle(2, now))
            }
        });
        let loser = cache.get_or_compute(now, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(bundle(3, now)) }
        });

        let (winner, loser) = tokio::join!(winner, loser);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(winner.unwrap().symbol_count, 2);
        // The loser was served the stale-but-good payload without waiting.
        assert_eq!(loser.unwrap().symbol_count, 1);
    }
}
