//! Compacted per-group time series for graphing.
//!
//! Each group keeps an ordered series of `(ts, value)` samples. A new
//! breakpoint is recorded only when the value moved materially since the
//! previous breakpoint and more than a minute has passed; otherwise the
//! latest sample is overwritten in place, so a flat signal costs two samples
//! no matter how often it is sampled. Samples older than a day are pruned,
//! at most once per 25 hours.

use rustc_hash::FxHashMap;
use serde::Serialize;

/// Prune once the oldest sample is this old.
pub const PRUNE_TRIGGER_SECS: f64 = 25.0 * 3600.0;
/// After pruning, keep samples younger than this.
pub const RETAIN_SECS: f64 = 24.0 * 3600.0;
/// Minimum spacing between breakpoints.
pub const BREAKPOINT_SECS: f64 = 60.0;
/// A move counts when `|prev - v| > |prev + v| / CHANGE_DIVISOR`
/// (0.05% of the average magnitude).
pub const CHANGE_DIVISOR: f64 = 2000.0;

/// One point of a history series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Sample {
    /// Unix seconds
    pub ts: f64,
    pub value: f64,
}

/// Per-group compacted series owned by one graphed parameter.
#[derive(Clone, Debug, Default, Serialize)]
pub struct History {
    series: FxHashMap<String, Vec<Sample>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` for `group` at time `now`.
    pub fn record(&mut self, group: &str, now: f64, value: f64) {
        match self.series.get_mut(group) {
            Some(series) => compact(series, now, value),
            None => {
                self.series.insert(group.to_string(), vec![Sample { ts: now, value }]);
            }
        }
    }

    /// Samples for `group`, oldest first.
    pub fn series(&self, group: &str) -> &[Sample] {
        self.series.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Groups with at least one sample, in no particular order.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

fn compact(series: &mut Vec<Sample>, now: f64, value: f64) {
    if series.len() > 1 && now - series[0].ts > PRUNE_TRIGGER_SECS {
        // First sample (past the head) that is still fresh; if every sample
        // is stale the series is left alone.
        if let Some(i) = series[1..].iter().position(|s| now - s.ts < RETAIN_SECS) {
            series.drain(..=i);
        }
    }

    let n = series.len();
    if n <= 1 {
        series.push(Sample { ts: now, value });
        return;
    }

    let prev = series[n - 2];
    let moved = (prev.value - value).abs() > (prev.value + value).abs() / CHANGE_DIVISOR;
    if now - prev.ts > BREAKPOINT_SECS && moved {
        series.push(Sample { ts: now, value });
    } else {
        series[n - 1] = Sample { ts: now, value };
    }
}
