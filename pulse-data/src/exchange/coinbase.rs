//! Coinbase Exchange REST client (primary provider).
//!
//! Product ids are already in the canonical `"<BASE>-USD"` form, so no
//! symbol translation is required here.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::RelayError;
use crate::types::DayStats;

use super::{PriceSource, de_f64_str};

const DEFAULT_BASE_URL: &str = "https://api.exchange.coinbase.com";
const PROVIDER: &str = "coinbase";

#[derive(Debug, Deserialize)]
struct Ticker {
    #[serde(deserialize_with = "de_f64_str")]
    price: f64,
}

#[derive(Debug, Deserialize)]
struct ProductStats {
    #[serde(deserialize_with = "de_f64_str")]
    open: f64,
    #[serde(deserialize_with = "de_f64_str")]
    last: f64,
    #[serde(deserialize_with = "de_f64_str")]
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct Product {
    id: String,
    quote_currency: String,
    status: String,
}

pub struct CoinbaseClient {
    http: reqwest::Client,
    base_url: String,
    discovery_timeout: Duration,
    fetch_delay: Duration,
}

impl CoinbaseClient {
    pub fn new(
        http_timeout: Duration,
        discovery_timeout: Duration,
        fetch_delay: Duration,
    ) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder().timeout(http_timeout).build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            discovery_timeout,
            fetch_delay,
        })
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<T, RelayError> {
        let mut request = self.http.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request
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
impl PriceSource for CoinbaseClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn current_prices(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, f64>, RelayError> {
        let mut prices = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            let url = format!("{}/products/{symbol}/ticker", self.base_url);
            match self.fetch_json::<Ticker>(&url, None).await {
                Ok(ticker) if ticker.price > 0.0 => {
                    prices.insert(symbol.clone(), ticker.price);
                }
                Ok(_) => debug!(%symbol, "non-positive ticker price skipped"),
                Err(error) => debug!(%symbol, %error, "ticker fetch failed for symbol"),
            }
            tokio::time::sleep(self.fetch_delay).await;
        }
        Ok(prices)
    }

    async fn day_stats(&self, symbols: &[String]) -> Result<HashMap<String, DayStats>, RelayError> {
        let mut stats = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            let url = format!("{}/products/{symbol}/stats", self.base_url);
            match self.fetch_json::<ProductStats>(&url, None).await {
                Ok(day) => {
                    stats.insert(
                        symbol.clone(),
                        DayStats {
                            open: day.open,
                            last: day.last,
                            volume: day.volume,
                        },
                    );
                }
                Err(error) => debug!(%symbol, %error, "stats fetch failed for symbol"),
            }
            tokio::time::sleep(self.fetch_delay).await;
        }
        Ok(stats)
    }

    async fn discover_usd_products(&self) -> Result<Vec<String>, RelayError> {
        let url = format!("{}/products", self.base_url);
        let products: Vec<Product> = self
            .fetch_json(&url, Some(self.discovery_timeout))
            .await?;
        Ok(products
            .into_iter()
            .filter(|p| p.quote_currency == "USD" && p.status == "online")
            .map(|p| p.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_deserialization() {
        let ticker: Ticker =
            serde_json::from_str(r#"{"trade_id": 1, "price": "97000.42", "size": "0.1"}"#).unwrap();
        assert!((ticker.price - 97000.42).abs() < 1e-9);

        let malformed = serde_json::from_str::<Ticker>(r#"{"price": "not-a-number"}"#);
        assert!(malformed.is_err());
    }

    #[test]
    fn test_stats_deserialization() {
        let stats: ProductStats = serde_json::from_str(
            r#"{"open": "96000", "high": "98000", "low": "95000", "last": "97000", "volume": "1234.5"}"#,
        )
        .unwrap();
        assert!((stats.open - 96000.0).abs() < 1e-9);
        assert!((stats.last - 97000.0).abs() < 1e-9);
        assert!((stats.volume - 1234.5).abs() < 1e-9);
    }

    #[test]
    fn test_product_filter_shape() {
        let products: Vec<Product> = serde_json::from_str(
            r#"[
                {"id": "BTC-USD", "quote_currency": "USD", "status": "online"},
                {"id": "ETH-EUR", "quote_currency": "EUR", "status": "online"},
                {"id": "OLD-USD", "quote_currency": "USD", "status": "delisted"}
            ]"#,
        )
        .unwrap();
        let online_usd: Vec<String> = products
            .into_iter()
            .filter(|p| p.quote_currency == "USD" && p.status == "online")
            .map(|p| p.id)
            .collect();
        assert_eq!(online_usd, vec!["BTC-USD"]);
    }
}
