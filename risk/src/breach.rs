//! Bound lookup, breach classification and trade-stop batching.

use std::collections::{BTreeMap, BTreeSet};

use log::info;
use openrisk::{AccountId, Breach, ParamValue, Position};
use openrisk_admin::{AccountAdmin, DisableRequest};

/// Bound for selector `index`: clamps to the last entry, NaN when empty.
pub fn bound_at(bounds: &[f64], index: usize) -> f64 {
    bounds
        .get(index)
        .or_else(|| bounds.last())
        .copied()
        .unwrap_or(f64::NAN)
}

/// Classify a parameter value against `[lower, upper]`.
///
/// Scalars get a row-level breach. Ranked lists get a breach per entry and
/// never a row-level one, so they cannot trigger trade stops.
pub fn classify(value: ParamValue, lower: f64, upper: f64) -> (ParamValue, Option<Breach>) {
    match value {
        ParamValue::Number(v) => {
            let breach = Breach::classify(v, lower, upper);
            (ParamValue::Number(v), breach)
        }
        ParamValue::Ranked(mut entries) => {
            for entry in &mut entries {
                entry.breach = Breach::classify(entry.value, lower, upper);
            }
            (ParamValue::Ranked(entries), None)
        }
        other => (other, None),
    }
}

/// Identifies a breach in a trade-stop reason.
#[derive(Clone, Copy, Debug)]
pub struct BreachContext<'a> {
    pub user_id: i64,
    pub portfolio: &'a str,
    pub risk: &'a str,
    pub parameter: &'a str,
    pub group: &'a str,
}

/// Human-readable reason attached to an account disable.
pub fn trade_stop_reason(ctx: &BreachContext<'_>, value: f64, lower: f64, upper: f64) -> String {
    format!(
        "OpenRisk: {} '{}' '{}' '{}' '{}' value {:.6} out of range [{:.6}, {:.6}]",
        ctx.user_id, ctx.portfolio, ctx.risk, ctx.parameter, ctx.group, value, lower, upper
    )
}

/// Pending account disables for one risk pass.
///
/// Recording the same account twice keeps the latest reason. Each account
/// is disabled at most once per pass, however many parameters breach.
#[derive(Debug, Default)]
pub(crate) struct TradeStops {
    pending: BTreeMap<AccountId, String>,
    issued: BTreeSet<AccountId>,
    requests: Vec<DisableRequest>,
}

impl TradeStops {
    /// Queue a disable for every account holding a position in `bucket`.
    pub fn record(&mut self, bucket: &[&Position], reason: &str) {
        for p in bucket {
            self.pending.insert(p.account, reason.to_string());
        }
    }

    /// Send every queued disable, once per account.
    pub fn flush(&mut self, admin: &dyn AccountAdmin) {
        for (account, reason) in std::mem::take(&mut self.pending) {
            if !self.issued.insert(account) {
                continue;
            }
            info!("trade stop: account {account}: {reason}");
            admin.disable_account(account, &reason);
            self.requests.push(DisableRequest::new(account, reason));
        }
    }

    pub fn into_requests(self) -> Vec<DisableRequest> {
        self.requests
    }
}
