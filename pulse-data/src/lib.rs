//! Pulse-Data - rolling-window market metrics over polled REST feeds.
//!
//! The pipeline polls upstream exchange REST APIs for current prices and
//! 24h statistics, maintains a bounded per-symbol history of observations,
//! derives "change over the last N minutes" views (gainers, losers, most
//! volatile, volume-significant banner), and fronts the whole computation
//! with a TTL cache so client traffic never multiplies upstream calls.
//!
//! The server surface lives in `pulse-data-server`; this crate is the
//! engine and can be driven with any [`exchange::PriceSource`]
//! implementation and an explicit clock, which is how the tests exercise
//! it.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod exchange;
pub mod history;
pub mod relay;
pub mod types;

pub use config::RelayConfig;
pub use error::RelayError;
pub use relay::MarketRelay;
pub use types::{DayStats, IntervalMove, MarketBundle, Sample, VolumeSignal};
