//! Counters for evaluations that degraded instead of failing.
//!
//! A risk pass never aborts on a bad position: the failing value becomes NaN
//! and the pass carries on. These counters make that visible.

use std::ops::AddAssign;

use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Formula evaluations that errored or did not yield a number.
    pub degraded_positions: usize,
    /// Per-position variable evaluations that errored.
    pub degraded_variables: usize,
    /// Filter evaluations that errored or did not yield a boolean.
    pub filter_errors: usize,
    /// Group predicate evaluations that errored or did not yield a boolean.
    pub group_errors: usize,
    /// `call` formulas the scripting bridge failed to answer.
    pub bridge_failures: usize,
}

impl Diagnostics {
    pub fn total(&self) -> usize {
        self.degraded_positions
            + self.degraded_variables
            + self.filter_errors
            + self.group_errors
            + self.bridge_failures
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

impl AddAssign for Diagnostics {
    fn add_assign(&mut self, rhs: Self) {
        self.degraded_positions += rhs.degraded_positions;
        self.degraded_variables += rhs.degraded_variables;
        self.filter_errors += rhs.filter_errors;
        self.group_errors += rhs.group_errors;
        self.bridge_failures += rhs.bridge_failures;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_and_merge() {
        let mut a = Diagnostics {
            degraded_positions: 2,
            ..Default::default()
        };
        assert!(!a.is_clean());
        a += Diagnostics {
            bridge_failures: 1,
            filter_errors: 3,
            ..Default::default()
        };
        assert_eq!(a.total(), 6);
        assert!(Diagnostics::default().is_clean());
    }
}
