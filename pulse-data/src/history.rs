//! Rolling per-symbol price history.
//!
//! Each symbol owns a bounded, insertion-ordered ring of samples; the store
//! answers "percentage change over the last N seconds" from irregularly
//! spaced polling observations.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};

use crate::types::Sample;

/// Bounded history of observations for one symbol.
///
/// Insertion order equals time order; the oldest sample is evicted once
/// `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct SymbolHistory {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SymbolHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an observation.
    ///
    /// Non-positive values are treated as "no observation" and dropped, as
    /// are samples that would break the non-decreasing time invariant.
    pub fn append(&mut self, time: DateTime<Utc>, value: f64) {
        if value <= 0.0 {
            return;
        }
        if let Some(last) = self.samples.back() {
            if time < last.time {
                return;
            }
        }
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(Sample { time, value });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    /// Percentage change of the latest sample against a baseline at least
    /// `window` old.
    ///
    /// The baseline is the earliest retained sample whose age is >= `window`.
    /// When history is shorter than the window (e.g. right after startup)
    /// the earliest retained sample is used instead - window precision is
    /// traded for earlier signal availability. Returns `None` with fewer
    /// than 2 samples, or when the baseline is non-positive.
    pub fn change_over_window(&self, now: DateTime<Utc>, window: Duration) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let current = self.samples.back()?.value;
        let baseline = self
            .samples
            .iter()
            .find(|sample| now - sample.time >= window)
            .or_else(|| self.samples.front())?
            .value;
        if baseline <= 0.0 {
            return None;
        }
        Some((current - baseline) / baseline * 100.0)
    }

    #[cfg(test)]
    fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }
}

/// Per-symbol rolling histories, created lazily on first observation.
#[derive(Debug)]
pub struct RollingHistory {
    capacity: usize,
    symbols: HashMap<String, SymbolHistory>,
}

impl RollingHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            symbols: HashMap::new(),
        }
    }

    pub fn append(&mut self, symbol: &str, time: DateTime<Utc>, value: f64) {
        self.symbols
            .entry(symbol.to_string())
            .or_insert_with(|| SymbolHistory::new(self.capacity))
            .append(time, value);
    }

    pub fn change_over_window(
        &self,
        symbol: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Option<f64> {
        self.symbols.get(symbol)?.change_over_window(now, window)
    }

    pub fn latest(&self, symbol: &str) -> Option<Sample> {
        self.symbols.get(symbol)?.latest()
    }

    /// Number of symbols with at least one retained sample.
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }
}
