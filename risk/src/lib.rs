//! Risk evaluation and breach-detection engine for openrisk.
//!
//! A [`RiskDef`] partitions a snapshot of positions into named groups,
//! evaluates each of its [`RiskParamDef`]s per group, classifies bound
//! breaches and disables the accounts behind trade-stopping breaches.
//! Graphed parameters keep a compacted per-group [`History`].
//!
//! Evaluation is best effort: a position whose formula fails counts as NaN,
//! a failed scripting call yields no value, and the pass carries on. The
//! [`Diagnostics`] in each [`RunReport`] count what degraded.
//!
//! ```
//! use std::sync::Arc;
//! use openrisk::{AccountId, Aggregate, FnExpression, Position, RunResult, Security};
//! use openrisk_admin::mock::RecordingAdmin;
//! use openrisk_risk::{AttributeTag, GroupSelector, RiskDef, RiskEnv, RiskParamDef};
//!
//! let tech = Arc::new(Security { sector: "Tech".into(), ..Security::new("AAPL") });
//! let positions = vec![Position::new(tech, AccountId(1), 100.0, 20.0)];
//!
//! let gross = FnExpression::numeric("sum(mv)", Aggregate::Sum, |p, _| p.market_value());
//! let mut def = RiskDef::new("exposure")
//!     .with_selector(GroupSelector::Attribute(AttributeTag::Sector))
//!     .with_param(
//!         RiskParamDef::new("gross", gross.into_arc())
//!             .with_bounds(vec![], vec![1_000.0])
//!             .with_trade_stop(true),
//!     );
//!
//! let admin = RecordingAdmin::new();
//! let result = def.run(&RiskEnv::new(&admin), &positions, "main", 7);
//! assert!(matches!(result, Some(RunResult::Single(ref rows)) if rows[0].breach.is_some()));
//! assert_eq!(admin.count_for(AccountId(1)), 1);
//! ```

pub mod breach;
mod build;
pub mod clock;
mod definition;
pub mod diagnostics;
mod error;
pub mod group;
pub mod history;
mod param;
pub mod section;
mod variables;

pub use build::{VAR_SECTION, parse_bounds, parse_go_bool, parse_window};
pub use clock::{Clock, ManualClock, SystemClock};
pub use definition::{RiskDef, RunReport};
pub use diagnostics::Diagnostics;
pub use error::BuildError;
pub use group::{AttributeTag, GroupSelector, Grouping};
pub use history::{History, Sample};
pub use param::{EvalContext, RiskParamDef, WindowDef};
pub use section::Section;
pub use variables::NamedExpression;

use openrisk::{AccountDirectory, AccountId, NoBridge, ScriptBridge};
use openrisk_admin::AccountAdmin;

/// Directory with no display names; `acc` groups stay empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAccounts;

impl AccountDirectory for NoAccounts {
    fn display_name(&self, _: AccountId) -> Option<&str> {
        None
    }
}

/// The collaborators a risk pass talks to.
#[derive(Clone, Copy)]
pub struct RiskEnv<'a> {
    pub accounts: &'a dyn AccountDirectory,
    pub bridge: &'a dyn ScriptBridge,
    pub admin: &'a dyn AccountAdmin,
    pub clock: &'a dyn Clock,
}

impl<'a> RiskEnv<'a> {
    /// No account names, no scripting bridge, system clock.
    pub fn new(admin: &'a dyn AccountAdmin) -> Self {
        Self {
            accounts: &NoAccounts,
            bridge: &NoBridge,
            admin,
            clock: &SystemClock,
        }
    }

    pub fn with_accounts(mut self, accounts: &'a dyn AccountDirectory) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_bridge(mut self, bridge: &'a dyn ScriptBridge) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = clock;
        self
    }
}
