//! End-to-end pipeline tests driven by a scripted provider and an explicit
//! clock - no network involved.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use pulse_data::exchange::PriceSource;
use pulse_data::{DayStats, MarketRelay, RelayConfig, RelayError};

/// Serves a scripted sequence of price snapshots; the last snapshot repeats
/// once the script is exhausted. The shared switch flips it into an outage.
struct ScriptedSource {
    name: &'static str,
    snapshots: Vec<HashMap<String, f64>>,
    cursor: Mutex<usize>,
    stats: HashMap<String, DayStats>,
    price_calls: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

#[derive(Clone, Default)]
struct SourceProbe {
    price_calls: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl ScriptedSource {
    fn new(name: &'static str, snapshots: Vec<HashMap<String, f64>>) -> (Self, SourceProbe) {
        let probe = SourceProbe::default();
        let source = Self {
            name,
            snapshots,
            cursor: Mutex::new(0),
            stats: HashMap::new(),
            price_calls: Arc::clone(&probe.price_calls),
            failing: Arc::clone(&probe.failing),
        };
        (source, probe)
    }

    fn always_failing(name: &'static str) -> Self {
        let (source, probe) = Self::new(name, Vec::new());
        probe.failing.store(true, Ordering::SeqCst);
        source
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn current_prices(
        &self,
        _symbols: &[String],
    ) -> Result<HashMap<String, f64>, RelayError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RelayError::upstream(self.name, "scripted outage"));
        }
        let mut cursor = self.cursor.lock().unwrap();
        let snapshot = self
            .snapshots
            .get(*cursor)
            .or_else(|| self.snapshots.last())
            .cloned()
            .unwrap_or_default();
        if *cursor + 1 < self.snapshots.len() {
            *cursor += 1;
        }
        Ok(snapshot)
    }

    async fn day_stats(
        &self,
        _symbols: &[String],
    ) -> Result<HashMap<String, DayStats>, RelayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RelayError::upstream(self.name, "scripted outage"));
        }
        Ok(self.stats.clone())
    }
}

fn snapshot(entries: &[(&str, f64)]) -> HashMap<String, f64> {
    entries.iter().map(|(s, p)| (s.to_string(), *p)).collect()
}

fn config(symbols: &[&str]) -> RelayConfig {
    RelayConfig {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        ..RelayConfig::default()
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn test_gain_appears_after_window_elapses() {
    let (source, _) = ScriptedSource::new(
        "scripted",
        vec![
            snapshot(&[("BTC-USD", 100.0)]),
            snapshot(&[("BTC-USD", 105.0)]),
        ],
    );
    let relay = MarketRelay::with_sources(&config(&["BTC-USD"]), vec![Box::new(source)]);

    let first = relay.refresh(t0()).await.unwrap();
    assert!(first.gainers.is_empty());
    assert!(first.losers.is_empty());

    let second = relay.refresh(t0() + Duration::seconds(181)).await.unwrap();
    assert_eq!(second.gainers.len(), 1);
    assert_eq!(second.gainers[0].symbol, "BTC-USD");
    assert!((second.gainers[0].change_pct - 5.0).abs() < 1e-6);
    assert!(second.losers.is_empty());
}

#[tokio::test]
async fn test_reads_within_ttl_hit_upstream_once() {
    let (source, probe) = ScriptedSource::new("scripted", vec![snapshot(&[("BTC-USD", 100.0)])]);
    let relay = MarketRelay::with_sources(&config(&["BTC-USD"]), vec![Box::new(source)]);

    let first = relay.bundle(t0()).await.unwrap();
    let second = relay.bundle(t0() + Duration::seconds(30)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(probe.price_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stale_read_recomputes_once_ttl_passes() {
    let (source, probe) = ScriptedSource::new(
        "scripted",
        vec![
            snapshot(&[("BTC-USD", 100.0)]),
            snapshot(&[("BTC-USD", 101.0)]),
        ],
    );
    let relay = MarketRelay::with_sources(&config(&["BTC-USD"]), vec![Box::new(source)]);

    let first = relay.bundle(t0()).await.unwrap();
    let later = t0() + Duration::seconds(61);
    let second = relay.bundle(later).await.unwrap();

    assert_eq!(first.updated_at, t0());
    assert_eq!(second.updated_at, later);
    assert_eq!(probe.price_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_outage_serves_last_good_bundle() {
    let (source, probe) = ScriptedSource::new("scripted", vec![snapshot(&[("BTC-USD", 100.0)])]);
    let relay = MarketRelay::with_sources(&config(&["BTC-USD"]), vec![Box::new(source)]);

    let good = relay.bundle(t0()).await.unwrap();

    probe.failing.store(true, Ordering::SeqCst);
    let stale = relay.bundle(t0() + Duration::seconds(120)).await.unwrap();
    assert_eq!(good, stale);
}

#[tokio::test]
async fn test_cold_start_outage_is_not_ready() {
    let relay = MarketRelay::with_sources(
        &config(&["BTC-USD"]),
        vec![Box::new(ScriptedSource::always_failing("scripted"))],
    );
    assert!(matches!(
        relay.bundle(t0()).await,
        Err(RelayError::NotReady)
    ));
}

#[tokio::test]
async fn test_secondary_provider_covers_primary_outage() {
    let primary = ScriptedSource::always_failing("primary");
    let (secondary, _) = ScriptedSource::new("secondary", vec![snapshot(&[("BTC-USD", 100.0)])]);

    let relay = MarketRelay::with_sources(
        &config(&["BTC-USD"]),
        vec![Box::new(primary), Box::new(secondary)],
    );

    let bundle = relay.refresh(t0()).await.unwrap();
    assert_eq!(bundle.symbol_count, 1);
}
