//! Interval aggregation: price snapshot -> rolling history -> ranked views.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::history::RollingHistory;
use crate::types::{DayStats, IntervalMove, MarketBundle, VolumeSignal};

/// Moves smaller than this (in percent) are dropped as sampling noise.
const NOISE_THRESHOLD_PCT: f64 = 0.01;

/// Scale applied to the 24h move when estimating short-term volume change.
const VOLUME_PROXY_SCALE: f64 = 0.5;
/// |24h move| beyond which the volume estimate gets the directional boost.
const STRONG_MOVE_PCT: f64 = 5.0;
const STRONG_MOVE_BOOST: f64 = 1.5;

const GAINERS_LIMIT: usize = 10;
const LOSERS_LIMIT: usize = 10;
const TOP24H_LIMIT: usize = 5;
const BANNER_LIMIT: usize = 20;

/// Consumes one price snapshot per cycle, maintains the rolling histories,
/// and derives the ranked gainer/loser/volatility/banner views.
#[derive(Debug)]
pub struct IntervalAggregator {
    history: RollingHistory,
    window: Duration,
}

impl IntervalAggregator {
    pub fn new(history_capacity: usize, window: Duration) -> Self {
        Self {
            history: RollingHistory::new(history_capacity),
            window,
        }
    }

    /// Ingest a snapshot and build the full result set.
    ///
    /// Symbols with non-positive prices contribute no sample and no result;
    /// symbols without enough history are silently absent this cycle.
    pub fn refresh(
        &mut self,
        prices: &HashMap<String, f64>,
        stats: &HashMap<String, DayStats>,
        now: DateTime<Utc>,
    ) -> MarketBundle {
        let mut moves = Vec::with_capacity(prices.len());
        for (symbol, price) in prices {
            if *price <= 0.0 {
                continue;
            }
            self.history.append(symbol, now, *price);

            let Some(change_pct) = self.history.change_over_window(symbol, now, self.window)
            else {
                continue;
            };
            if change_pct.abs() < NOISE_THRESHOLD_PCT {
                continue;
            }
            moves.push(IntervalMove {
                symbol: symbol.clone(),
                current: *price,
                change_pct,
            });
        }
        debug!(
            symbols = prices.len(),
            signals = moves.len(),
            "aggregated interval snapshot"
        );

        let mut gainers: Vec<IntervalMove> = moves
            .iter()
            .filter(|m| m.change_pct > 0.0)
            .cloned()
            .collect();
        gainers.sort_by(|a, b| cmp_f64(b.change_pct, a.change_pct));
        gainers.truncate(GAINERS_LIMIT);

        let mut losers: Vec<IntervalMove> = moves
            .iter()
            .filter(|m| m.change_pct < 0.0)
            .cloned()
            .collect();
        losers.sort_by(|a, b| cmp_f64(a.change_pct, b.change_pct));
        losers.truncate(LOSERS_LIMIT);

        let mut top24h = moves;
        top24h.sort_by(|a, b| cmp_f64(b.change_pct.abs(), a.change_pct.abs()));
        top24h.truncate(TOP24H_LIMIT);

        MarketBundle {
            gainers,
            losers,
            top24h,
            banner: rank_volume_signals(stats),
            updated_at: now,
            symbol_count: prices.len(),
        }
    }
}

/// Estimate short-term volume change from 24h price volatility.
///
/// The providers only report 24h totals, so this is a proxy, not a measured
/// delta: the 24h move is scaled down, then boosted for strong directional
/// moves where turnover concentration is likeliest.
fn volume_change_estimate(stats: &DayStats) -> Option<f64> {
    if stats.open <= 0.0 || stats.last <= 0.0 {
        return None;
    }
    let daily_move_pct = (stats.last - stats.open) / stats.open * 100.0;
    let mut estimate = daily_move_pct * VOLUME_PROXY_SCALE;
    if daily_move_pct.abs() >= STRONG_MOVE_PCT {
        estimate *= STRONG_MOVE_BOOST;
    }
    Some(estimate)
}

/// Rank symbols by estimated volume significance: `|estimate| * volume`,
/// descending, truncated to the banner limit.
fn rank_volume_signals(stats: &HashMap<String, DayStats>) -> Vec<VolumeSignal> {
    let mut signals: Vec<VolumeSignal> = stats
        .iter()
        .filter_map(|(symbol, day)| {
            let volume_change_pct = volume_change_estimate(day)?;
            Some(VolumeSignal {
                symbol: symbol.clone(),
                volume_change_pct,
                volume: day.volume,
            })
        })
        .collect();
    signals.sort_by(|a, b| {
        cmp_f64(
            b.volume_change_pct.abs() * b.volume,
            a.volume_change_pct.abs() * a.volume,
        )
    });
    signals.truncate(BANNER_LIMIT);
    signals
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
