//! Numeric aggregators used to reduce per-position values over a group.
//!
//! All functions are total: empty input yields NaN where the statistic is
//! undefined instead of panicking. NaN inputs propagate through `sum`,
//! `mean` and `std`; only [`top_n`] drops them.

use crate::result::RankedEntry;

/// Number of values, as a float.
pub fn length(values: &[f64]) -> f64 {
    values.len() as f64
}

/// Arithmetic sum (0.0 for empty input).
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Arithmetic mean, NaN for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    sum(values) / length(values)
}

/// Population standard deviation: `sqrt(mean((x - mean(x))^2))`.
///
/// Divides by `n`, not `n - 1`. NaN for empty input.
pub fn std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mu = mean(values);
    let ss: f64 = values.iter().map(|x| (x - mu).powi(2)).sum();
    (ss / length(values)).sqrt()
}

/// Rank labelled values.
///
/// NaN values are dropped first. `n > 0` keeps the `n` largest (descending),
/// `n < 0` keeps the `|n|` smallest (ascending), `n == 0` keeps every entry
/// in input order. The sort is stable, so ties keep input order.
pub fn top_n<I>(entries: I, n: i32) -> Vec<RankedEntry>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut ranked: Vec<RankedEntry> = entries
        .into_iter()
        .filter(|(_, v)| !v.is_nan())
        .map(|(label, value)| RankedEntry::new(label, value))
        .collect();

    // TODO: select_nth_unstable_by before sorting when n is small relative to the group
    if n > 0 {
        ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
    } else if n < 0 {
        ranked.sort_by(|a, b| a.value.total_cmp(&b.value));
    }
    let keep = n.unsigned_abs() as usize;
    if n != 0 && keep < ranked.len() {
        ranked.truncate(keep);
    }
    ranked
}
