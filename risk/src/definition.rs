//! Risk definitions: grouping, per-parameter evaluation and breach handling.

use std::collections::BTreeMap;
use std::sync::Arc;

use openrisk::{Expression, GroupValue, Position, RunResult};
use openrisk_admin::DisableRequest;
use serde::Serialize;

use crate::RiskEnv;
use crate::breach::{self, BreachContext, TradeStops};
use crate::diagnostics::Diagnostics;
use crate::group::{GroupSelector, Grouping};
use crate::param::{EvalContext, RiskParamDef};

/// Everything one pass of a [`RiskDef`] produced.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    /// `None` when no parameter produced a row.
    pub result: Option<RunResult>,
    pub diagnostics: Diagnostics,
    /// Disable actions issued during the pass, in issue order.
    pub trade_stops: Vec<DisableRequest>,
}

/// A named set of risk parameters evaluated over the same grouping.
///
/// History on graphed parameters is mutated by every pass, so a definition
/// must not be run concurrently with itself; `&mut self` on
/// [`evaluate`](Self::evaluate) enforces that.
#[derive(Clone, Debug)]
pub struct RiskDef {
    name: String,
    display_name: String,
    module_path: String,
    selectors: Vec<GroupSelector>,
    group_names: Vec<String>,
    filter: Option<Arc<dyn Expression>>,
    params: Vec<RiskParamDef>,
}

impl RiskDef {
    /// Create an ungrouped definition with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            module_path: String::new(),
            selectors: Vec::new(),
            group_names: Vec::new(),
            filter: None,
            params: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_module_path(mut self, module_path: impl Into<String>) -> Self {
        self.module_path = module_path.into();
        self
    }

    /// Add a selector; its group name is taken from the selector.
    pub fn with_selector(mut self, selector: GroupSelector) -> Self {
        self.group_names.push(selector.name().to_string());
        self.selectors.push(selector);
        self
    }

    pub fn with_filter(mut self, filter: Arc<dyn Expression>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_param(mut self, param: RiskParamDef) -> Self {
        self.params.push(param);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    pub fn selectors(&self) -> &[GroupSelector] {
        &self.selectors
    }

    /// Configured group names, parallel to [`selectors`](Self::selectors).
    /// Predicate selectors label their groups with these.
    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }

    pub fn filter(&self) -> Option<&Arc<dyn Expression>> {
        self.filter.as_ref()
    }

    pub fn params(&self) -> &[RiskParamDef] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&RiskParamDef> {
        self.params.iter().find(|p| p.name() == name)
    }

    pub fn param_mut(&mut self, name: &str) -> Option<&mut RiskParamDef> {
        self.params.iter_mut().find(|p| p.name() == name)
    }

    pub(crate) fn push_param(&mut self, param: RiskParamDef) {
        self.params.push(param);
    }

    pub(crate) fn set_groups(&mut self, selectors: Vec<GroupSelector>, names: Vec<String>) {
        self.selectors = selectors;
        self.group_names = names;
    }

    pub(crate) fn set_filter(&mut self, filter: Option<Arc<dyn Expression>>) {
        self.filter = filter;
    }

    /// Evaluate every parameter over `positions`; result only.
    pub fn run(
        &mut self,
        env: &RiskEnv<'_>,
        positions: &[Position],
        portfolio: &str,
        user_id: i64,
    ) -> Option<RunResult> {
        self.evaluate(env, positions, portfolio, user_id).result
    }

    /// Evaluate every parameter over `positions`.
    ///
    /// Groups are visited in grouping order; parameters in declaration order.
    /// Trade stops are flushed to `env.admin` after each parameter, at most
    /// once per account for the whole pass.
    pub fn evaluate(
        &mut self,
        env: &RiskEnv<'_>,
        positions: &[Position],
        portfolio: &str,
        user_id: i64,
    ) -> RunReport {
        let mut diagnostics = Diagnostics::default();
        let grouping = Grouping::partition(
            &self.selectors,
            self.filter.as_deref(),
            positions,
            env.accounts,
            &mut diagnostics,
        );
        let ctx = EvalContext {
            bridge: env.bridge,
            module_path: &self.module_path,
            now: env.clock.now_secs(),
        };

        let mut stops = TradeStops::default();
        let mut outputs: Vec<(String, Vec<GroupValue>)> = Vec::with_capacity(self.params.len());
        for param in &mut self.params {
            let mut rows = Vec::new();
            for (group, index, bucket) in grouping.iter() {
                if bucket.is_empty() {
                    continue;
                }
                let value = param.run_with(group, bucket, &ctx, &mut diagnostics);
                let lower = param.lower_bound(index);
                let upper = param.upper_bound(index);
                let (value, mut breach) = breach::classify(value, lower, upper);

                if let (Some(b), Some(v), true) =
                    (breach.as_mut(), value.as_number(), param.trade_stop())
                {
                    b.trade_stop = true;
                    let at = BreachContext {
                        user_id,
                        portfolio,
                        risk: &self.name,
                        parameter: param.name(),
                        group,
                    };
                    stops.record(bucket, &breach::trade_stop_reason(&at, v, lower, upper));
                }

                rows.push(GroupValue {
                    group: group.to_string(),
                    value,
                    breach,
                });
            }
            stops.flush(env.admin);
            outputs.push((param.name().to_string(), rows));
        }

        RunReport {
            result: assemble(outputs),
            diagnostics,
            trade_stops: stops.into_requests(),
        }
    }
}

/// One parameter: its rows unwrapped. Several: keyed by parameter name,
/// empty ones dropped. Nothing at all: `None`.
fn assemble(mut outputs: Vec<(String, Vec<GroupValue>)>) -> Option<RunResult> {
    if outputs.len() == 1 {
        return outputs
            .pop()
            .map(|(_, rows)| rows)
            .filter(|rows| !rows.is_empty())
            .map(RunResult::Single);
    }
    let by_param: BTreeMap<String, Vec<GroupValue>> = outputs
        .into_iter()
        .filter(|(_, rows)| !rows.is_empty())
        .collect();
    (!by_param.is_empty()).then_some(RunResult::ByParameter(by_param))
}
