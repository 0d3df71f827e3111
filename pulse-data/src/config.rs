//! Relay configuration derived from environment variables.
//!
//! Every option has a hard default so the relay runs with zero setup;
//! `PULSE_*` variables override individual values.

use std::env;
use std::net::SocketAddr;
use std::time::Duration as StdDuration;

use chrono::Duration;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_MAX_SYMBOLS: usize = 50;
const DEFAULT_REFRESH_SECS: u64 = 30;
const DEFAULT_CACHE_TTL_SECS: i64 = 60;
const DEFAULT_WINDOW_SECS: i64 = 180;
const DEFAULT_HISTORY_CAPACITY: usize = 20;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FETCH_DELAY_MS: u64 = 100;
const DEFAULT_WS_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// HTTP + WebSocket listen address.
    pub bind: SocketAddr,
    /// Tracked products. Empty means "discover all online USD pairs".
    pub symbols: Vec<String>,
    /// Per-cycle batch cap; upstream rate limits make unbounded fan-out unsafe.
    pub max_symbols: usize,
    /// Publisher tick interval.
    pub refresh_interval: StdDuration,
    /// Refresh-cache time-to-live.
    pub cache_ttl: Duration,
    /// Look-back window for interval change computation.
    pub window: Duration,
    /// Per-symbol history ring-buffer capacity.
    pub history_capacity: usize,
    /// Per-call upstream timeout.
    pub http_timeout: StdDuration,
    /// Product discovery timeout (one larger listing call).
    pub discovery_timeout: StdDuration,
    /// Delay between consecutive per-symbol upstream calls.
    pub fetch_delay: StdDuration,
    /// Broadcast channel capacity for WebSocket updates.
    pub ws_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.parse().expect("default bind address is valid"),
            symbols: Vec::new(),
            max_symbols: DEFAULT_MAX_SYMBOLS,
            refresh_interval: StdDuration::from_secs(DEFAULT_REFRESH_SECS),
            cache_ttl: Duration::seconds(DEFAULT_CACHE_TTL_SECS),
            window: Duration::seconds(DEFAULT_WINDOW_SECS),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            http_timeout: StdDuration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            discovery_timeout: StdDuration::from_secs(DEFAULT_DISCOVERY_TIMEOUT_SECS),
            fetch_delay: StdDuration::from_millis(DEFAULT_FETCH_DELAY_MS),
            ws_buffer: DEFAULT_WS_BUFFER,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: env_str("PULSE_BIND", DEFAULT_BIND)
                .parse()
                .unwrap_or(defaults.bind),
            symbols: parse_symbols(&env_str("PULSE_SYMBOLS", "")),
            max_symbols: env_usize("PULSE_MAX_SYMBOLS", DEFAULT_MAX_SYMBOLS),
            refresh_interval: StdDuration::from_secs(env_u64(
                "PULSE_REFRESH_SECS",
                DEFAULT_REFRESH_SECS,
            )),
            cache_ttl: Duration::seconds(env_i64(
                "PULSE_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )),
            window: Duration::seconds(env_i64("PULSE_WINDOW_SECS", DEFAULT_WINDOW_SECS)),
            history_capacity: env_usize("PULSE_HISTORY_CAPACITY", DEFAULT_HISTORY_CAPACITY),
            http_timeout: StdDuration::from_secs(env_u64(
                "PULSE_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            discovery_timeout: StdDuration::from_secs(env_u64(
                "PULSE_DISCOVERY_TIMEOUT_SECS",
                DEFAULT_DISCOVERY_TIMEOUT_SECS,
            )),
            fetch_delay: StdDuration::from_millis(env_u64(
                "PULSE_FETCH_DELAY_MS",
                DEFAULT_FETCH_DELAY_MS,
            )),
            ws_buffer: env_usize("PULSE_WS_BUFFER", DEFAULT_WS_BUFFER),
        }
    }
}

/// Parse a comma-separated product list, e.g. `"BTC-USD, eth-usd"`.
fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_str(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
