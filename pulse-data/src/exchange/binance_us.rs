//! Binance.US REST client (secondary provider).
//!
//! Binance reports bare concatenated tickers (`"BTCUSD"`); both fetch paths
//! pull the full listing in one call and translate into the canonical
//! `"<BASE>-USD"` form before filtering to the requested set.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::RelayError;
use crate::types::DayStats;

use super::{PriceSource, de_f64_str};

const DEFAULT_BASE_URL: &str = "https://api.binance.us";
const PROVIDER: &str = "binance.us";

#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    #[serde(deserialize_with = "de_f64_str")]
    price: f64,
}

#[derive(Debug, Deserialize)]
struct Ticker24h {
    symbol: String,
    #[serde(rename = "openPrice", deserialize_with = "de_f64_str")]
    open_price: f64,
    #[serde(rename = "lastPrice", deserialize_with = "de_f64_str")]
    last_price: f64,
    #[serde(deserialize_with = "de_f64_str")]
    volume: f64,
}

pub struct BinanceUsClient {
    http: reqwest::Client,
    base_url: String,
}

impl BinanceUsClient {
    pub fn new(http_timeout: Duration) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder().timeout(http_timeout).build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, RelayError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RelayError::upstream(PROVIDER, e))?;
        if !response.status().is_success() {
            return Err(RelayError::upstream(PROVIDER, response.status()));
        }
        response
            .json()
            .await
            .map_err(|e| RelayError::malformed(PROVIDER, e))
    }
}

#[async_trait]
impl PriceSource for BinanceUsClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn current_prices(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, f64>, RelayError> {
        let requested: HashSet<&str> = symbols.iter().map(String::as_str).collect();
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let tickers: Vec<TickerPrice> = self.fetch_json(&url).await?;

        Ok(tickers
            .into_iter()
            .filter_map(|t| {
                let symbol = to_canonical(&t.symbol)?;
                (requested.contains(symbol.as_str()) && t.price > 0.0).then_some((symbol, t.price))
            })
            .collect())
    }

    async fn day_stats(&self, symbols: &[String]) -> Result<HashMap<String, DayStats>, RelayError> {
        let requested: HashSet<&str> = symbols.iter().map(String::as_str).collect();
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let tickers: Vec<Ticker24h> = self.fetch_json(&url).await?;

        Ok(tickers
            .into_iter()
            .filter_map(|t| {
                let symbol = to_canonical(&t.symbol)?;
                requested.contains(symbol.as_str()).then_some((
                    symbol,
                    DayStats {
                        open: t.open_price,
                        last: t.last_price,
                        volume: t.volume,
                    },
                ))
            })
            .collect())
    }

    async fn discover_usd_products(&self) -> Result<Vec<String>, RelayError> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let tickers: Vec<TickerPrice> = self.fetch_json(&url).await?;
        Ok(tickers
            .into_iter()
            .filter_map(|t| to_canonical(&t.symbol))
            .collect())
    }
}

/// Translate a bare Binance ticker into the canonical `"<BASE>-USD"` form.
///
/// Only true USD-quoted pairs qualify: USDT/USDC pairs do not end in "USD",
/// but BUSD pairs do and must be excluded explicitly.
fn to_canonical(symbol: &str) -> Option<String> {
    if symbol.ends_with("BUSD") || !symbol.ends_with("USD") {
        return None;
    }
    let base = &symbol[..symbol.len() - 3];
    if base.is_empty() {
        return None;
    }
    Some(format!("{base}-USD"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_canonical() {
        struct TestCase {
            input: &'static str,
            expected: Option<&'static str>,
        }

        let tests = vec![
            TestCase { input: "BTCUSD", expected: Some("BTC-USD") },
            TestCase { input: "SHIBUSD", expected: Some("SHIB-USD") },
            TestCase { input: "BTCUSDT", expected: None },
            TestCase { input: "BTCUSDC", expected: None },
            TestCase { input: "BTCBUSD", expected: None },
            TestCase { input: "USD", expected: None },
            TestCase { input: "ETHEUR", expected: None },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = to_canonical(test.input);
            assert_eq!(
                actual.as_deref(),
                test.expected,
                "TC{index} failed for {}",
                test.input
            );
        }
    }

    #[test]
    fn test_ticker_price_deserialization() {
        let tickers: Vec<TickerPrice> = serde_json::from_str(
            r#"[
                {"symbol": "BTCUSD", "price": "97000.42"},
                {"symbol": "ETHUSDT", "price": "3500.10"}
            ]"#,
        )
        .unwrap();
        assert_eq!(tickers.len(), 2);
        assert_eq!(tickers[0].symbol, "BTCUSD");
        assert!((tickers[0].price - 97000.42).abs() < 1e-9);
    }

    #[test]
    fn test_ticker_24h_deserialization() {
        let ticker: Ticker24h = serde_json::from_str(
            r#"{
                "symbol": "BTCUSD",
                "openPrice": "96000.00",
                "lastPrice": "97000.00",
                "volume": "512.25",
                "priceChangePercent": "1.04"
            }"#,
        )
        .unwrap();
        assert!((ticker.open_price - 96000.0).abs() < 1e-9);
        assert!((ticker.last_price - 97000.0).abs() < 1e-9);
        assert!((ticker.volume - 512.25).abs() < 1e-9);
    }
}
