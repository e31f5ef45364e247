//! Parameter evaluation: one formula over one group of positions.

use std::sync::Arc;

use log::{debug, warn};
use openrisk::{
    Aggregate, EvalValue, Expression, ParamValue, Position, ScriptBridge, Variables, stats,
};

use crate::breach;
use crate::diagnostics::Diagnostics;
use crate::history::{History, Sample};
use crate::variables::{self, NamedExpression};

/// Reducer for formulas that name none: the ten largest per-position values.
static DEFAULT_TOP: Aggregate = Aggregate::DEFAULT_TOP;

/// Evaluation window. Descriptive only; carried through to consumers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindowDef {
    pub seconds: i64,
    pub kind: String,
}

/// What a parameter evaluation needs from the outside world.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub bridge: &'a dyn ScriptBridge,
    /// Module path handed to `call` formulas.
    pub module_path: &'a str,
    /// Unix seconds, stamped on history samples.
    pub now: f64,
}

/// One risk parameter: a formula, its bounds and its trade-stop policy.
#[derive(Clone, Debug)]
pub struct RiskParamDef {
    name: String,
    formula: Arc<dyn Expression>,
    lower_bounds: Vec<f64>,
    upper_bounds: Vec<f64>,
    trade_stop: bool,
    window: WindowDef,
    variables: Vec<NamedExpression>,
    history: Option<History>,
}

impl RiskParamDef {
    pub fn new(name: impl Into<String>, formula: Arc<dyn Expression>) -> Self {
        Self {
            name: name.into(),
            formula,
            lower_bounds: Vec::new(),
            upper_bounds: Vec::new(),
            trade_stop: false,
            window: WindowDef::default(),
            variables: Vec::new(),
            history: None,
        }
    }

    /// Bounds indexed by group selector; the last entry covers any further
    /// selectors. Empty means unbounded.
    pub fn with_bounds(mut self, lower: Vec<f64>, upper: Vec<f64>) -> Self {
        self.lower_bounds = lower;
        self.upper_bounds = upper;
        self
    }

    pub fn with_trade_stop(mut self, trade_stop: bool) -> Self {
        self.trade_stop = trade_stop;
        self
    }

    pub fn with_window(mut self, window: WindowDef) -> Self {
        self.window = window;
        self
    }

    pub fn with_variable(mut self, var: NamedExpression) -> Self {
        self.variables.push(var);
        self
    }

    pub fn with_variables(mut self, vars: Vec<NamedExpression>) -> Self {
        self.variables = vars;
        self
    }

    /// Turn on history recording. Only aggregate formulas can be graphed;
    /// for anything else this logs a warning and leaves graphing off.
    pub fn with_graph(mut self) -> Self {
        self.enable_graph();
        self
    }

    /// See [`with_graph`](Self::with_graph). Returns whether graphing is on.
    pub fn enable_graph(&mut self) -> bool {
        if !self.formula.is_aggregate() {
            warn!(
                "graph only allowable for aggregate formula: {} ({})",
                self.name,
                self.formula.source()
            );
            return false;
        }
        if self.history.is_none() {
            self.history = Some(History::new());
        }
        true
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn formula(&self) -> &Arc<dyn Expression> {
        &self.formula
    }

    pub fn lower_bounds(&self) -> &[f64] {
        &self.lower_bounds
    }

    pub fn upper_bounds(&self) -> &[f64] {
        &self.upper_bounds
    }

    /// Effective lower bound for the group found by selector `index`.
    pub fn lower_bound(&self, index: usize) -> f64 {
        breach::bound_at(&self.lower_bounds, index)
    }

    /// Effective upper bound for the group found by selector `index`.
    pub fn upper_bound(&self, index: usize) -> f64 {
        breach::bound_at(&self.upper_bounds, index)
    }

    pub fn trade_stop(&self) -> bool {
        self.trade_stop
    }

    pub fn window(&self) -> &WindowDef {
        &self.window
    }

    pub fn variables(&self) -> &[NamedExpression] {
        &self.variables
    }

    pub fn graph(&self) -> bool {
        self.history.is_some()
    }

    /// Recorded history for `group` (empty unless graphing is on).
    pub fn history(&self, group: &str) -> &[Sample] {
        self.history
            .as_ref()
            .map(|h| h.series(group))
            .unwrap_or(&[])
    }

    pub fn history_all(&self) -> Option<&History> {
        self.history.as_ref()
    }

    /// Evaluate the formula for `group`.
    pub fn run(
        &mut self,
        group: &str,
        positions: &[&Position],
        ctx: &EvalContext<'_>,
    ) -> ParamValue {
        self.run_with(group, positions, ctx, &mut Diagnostics::default())
    }

    /// [`run`](Self::run), counting degraded evaluations into `diag`.
    pub fn run_with(
        &mut self,
        group: &str,
        positions: &[&Position],
        ctx: &EvalContext<'_>,
        diag: &mut Diagnostics,
    ) -> ParamValue {
        let aggregate = match self.formula.aggregate() {
            Aggregate::None => &DEFAULT_TOP,
            other => other,
        };

        let value = if let Aggregate::Call(_) = aggregate {
            reduce(
                self.formula.as_ref(),
                aggregate,
                positions,
                &mut Variables::default(),
                &[],
                ctx,
                diag,
            )
        } else {
            let mut scope = variables::resolve_aggregates(&self.variables, positions, ctx, diag);
            reduce(
                self.formula.as_ref(),
                aggregate,
                positions,
                &mut scope,
                &self.variables,
                ctx,
                diag,
            )
        };

        if let (Some(history), ParamValue::Number(v)) = (self.history.as_mut(), &value) {
            history.record(group, ctx.now, *v);
        }
        value
    }
}

/// Evaluate `expr` once per position and reduce with `aggregate`.
///
/// `per_position` variables are rebound before each position. Errors and
/// non-numeric results degrade that one position to NaN.
pub(crate) fn reduce(
    expr: &dyn Expression,
    aggregate: &Aggregate,
    positions: &[&Position],
    scope: &mut Variables,
    per_position: &[NamedExpression],
    ctx: &EvalContext<'_>,
    diag: &mut Diagnostics,
) -> ParamValue {
    if let Aggregate::Call(spec) = aggregate {
        return match ctx.bridge.call(spec, positions, ctx.module_path) {
            Ok(v) => v,
            Err(e) => {
                warn!("{} failed: {e}", expr.source());
                diag.bridge_failures += 1;
                ParamValue::Absent
            }
        };
    }

    let mut values = Vec::with_capacity(positions.len());
    for &p in positions {
        variables::resolve_per_position(per_position, p, scope, diag);
        let v = match expr.evaluate(p, scope) {
            Ok(EvalValue::Number(v)) => v,
            Ok(other) => {
                debug!(
                    "{} yielded a {} for {}",
                    expr.source(),
                    other.type_name(),
                    p.security.symbol
                );
                diag.degraded_positions += 1;
                f64::NAN
            }
            Err(e) => {
                debug!("{} degraded for {}: {e}", expr.source(), p.security.symbol);
                diag.degraded_positions += 1;
                f64::NAN
            }
        };
        values.push(v);
    }

    match aggregate {
        Aggregate::Sum => ParamValue::scalar(stats::sum(&values)),
        Aggregate::Mean => ParamValue::scalar(stats::mean(&values)),
        Aggregate::Std => ParamValue::scalar(stats::std(&values)),
        Aggregate::Len => ParamValue::scalar(stats::length(&values)),
        Aggregate::Top(n) => top(positions, values, *n),
        _ => top(positions, values, 10),
    }
}

fn top(positions: &[&Position], values: Vec<f64>, n: i32) -> ParamValue {
    let labelled = positions
        .iter()
        .map(|p| p.security.symbol.clone())
        .zip(values);
    ParamValue::Ranked(stats::top_n(labelled, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use openrisk::{
        AccountId, BridgeError, CallSpec, EvalError, FnExpression, NoBridge, RankedEntry, Security,
    };

    fn book() -> Vec<Position> {
        [("A", 5.0), ("B", 1.0), ("C", 9.0), ("D", 3.0)]
            .into_iter()
            .map(|(s, px)| Position::new(Arc::new(Security::new(s)), AccountId(1), 1.0, px))
            .collect()
    }

    fn ctx() -> EvalContext<'static> {
        EvalContext {
            bridge: &NoBridge,
            module_path: "scripts",
            now: 1_700_000_000.0,
        }
    }

    fn price(aggregate: Aggregate) -> Arc<dyn Expression> {
        FnExpression::numeric(format!("{}(px)", aggregate.tag()), aggregate, |p, _| p.price)
            .into_arc()
    }

    #[test]
    fn scalar_reducers() {
        let owned = book();
        let refs: Vec<&Position> = owned.iter().collect();
        let cases = [
            (Aggregate::Sum, 18.0),
            (Aggregate::Mean, 4.5),
            (Aggregate::Len, 4.0),
        ];
        for (agg, want) in cases {
            let mut p = RiskParamDef::new("x", price(agg));
            assert_eq!(p.run("", &refs, &ctx()), ParamValue::Number(want));
        }
    }

    #[test]
    fn empty_group_mean_is_nan_marker() {
        let mut p = RiskParamDef::new("x", price(Aggregate::Mean));
        assert_eq!(p.run("", &[], &ctx()), ParamValue::NotANumber);
    }

    #[test]
    fn default_reducer_is_top_ten() {
        let owned = book();
        let refs: Vec<&Position> = owned.iter().collect();
        let mut p = RiskParamDef::new("x", price(Aggregate::None));
        let value = p.run("", &refs, &ctx());
        let ranked = value.as_ranked().unwrap();
        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0], RankedEntry::new("C", 9.0));
        assert_eq!(ranked[3], RankedEntry::new("B", 1.0));
    }

    #[test]
    fn failing_position_degrades_to_nan() {
        let owned = book();
        let refs: Vec<&Position> = owned.iter().collect();
        let formula = FnExpression::new("top(px)", Aggregate::Top(0), |p, _| {
            if p.security.symbol == "B" {
                Err(EvalError::Other("no quote".into()))
            } else {
                Ok(EvalValue::Number(p.price))
            }
        });
        let mut p = RiskParamDef::new("x", formula.into_arc());
        let mut diag = Diagnostics::default();
        let value = p.run_with("", &refs, &ctx(), &mut diag);
        let labels: Vec<_> = value
            .as_ranked()
            .unwrap()
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(labels, ["A", "C", "D"]);
        assert_eq!(diag.degraded_positions, 1);
    }

    #[test]
    fn non_numeric_result_degrades() {
        let owned = book();
        let refs: Vec<&Position> = owned.iter().collect();
        let formula = FnExpression::predicate("px > 2", |p| p.price > 2.0);
        let mut p = RiskParamDef::new("x", formula.into_arc());
        let mut diag = Diagnostics::default();
        let value = p.run_with("", &refs, &ctx(), &mut diag);
        assert_eq!(value, ParamValue::Ranked(vec![]));
        assert_eq!(diag.degraded_positions, 4);
    }

    #[test]
    fn per_position_variables_see_aggregates() {
        let owned = book();
        let refs: Vec<&Position> = owned.iter().collect();
        let avg = NamedExpression::new("avg", price(Aggregate::Mean));
        let dev = NamedExpression::new(
            "dev",
            FnExpression::numeric("px - avg", Aggregate::None, |p, vars| {
                p.price - vars["avg"].as_number().unwrap_or(f64::NAN)
            })
            .into_arc(),
        );
        let formula = FnExpression::numeric("sum(dev * dev)", Aggregate::Sum, |_, vars| {
            let d = vars["dev"].as_number().unwrap_or(f64::NAN);
            d * d
        });
        let mut p = RiskParamDef::new("var", formula.into_arc()).with_variables(vec![avg, dev]);
        // (0.5^2 + 3.5^2 + 4.5^2 + 1.5^2)
        assert_eq!(p.run("", &refs, &ctx()), ParamValue::Number(35.0));
    }

    struct FixedBridge(f64);

    impl ScriptBridge for FixedBridge {
        fn call(
            &self,
            spec: &CallSpec,
            positions: &[&Position],
            module_path: &str,
        ) -> Result<ParamValue, BridgeError> {
            assert_eq!(spec.function, "var95");
            assert_eq!(module_path, "scripts");
            Ok(ParamValue::Number(self.0 * positions.len() as f64))
        }
    }

    #[test]
    fn call_formula_goes_to_bridge() {
        let owned = book();
        let refs: Vec<&Position> = owned.iter().collect();
        let spec = CallSpec {
            module: "risk".into(),
            function: "var95".into(),
            args: "0.95".into(),
        };
        let formula = FnExpression::new("call(risk.var95)", Aggregate::Call(spec), |_, _| {
            Err(EvalError::Other("never evaluated per position".into()))
        });
        let mut p = RiskParamDef::new("var", formula.into_arc());

        let bridge = FixedBridge(2.5);
        let with_bridge = EvalContext {
            bridge: &bridge,
            ..ctx()
        };
        assert_eq!(p.run("", &refs, &with_bridge), ParamValue::Number(10.0));

        // NoBridge fails the call: absent value, nothing raised
        let mut diag = Diagnostics::default();
        assert_eq!(p.run_with("", &refs, &ctx(), &mut diag), ParamValue::Absent);
        assert_eq!(diag.bridge_failures, 1);
    }

    #[test]
    fn graph_rejected_for_per_position_formula() {
        let mut p = RiskParamDef::new("x", price(Aggregate::None));
        assert!(!p.enable_graph());
        assert!(!p.graph());

        let p = RiskParamDef::new("x", price(Aggregate::Sum)).with_graph();
        assert!(p.graph());
    }

    #[test]
    fn graph_records_scalars_only() {
        let owned = book();
        let refs: Vec<&Position> = owned.iter().collect();
        let mut p = RiskParamDef::new("x", price(Aggregate::Sum)).with_graph();
        p.run("Tech", &refs, &ctx());
        assert_eq!(p.history("Tech").len(), 1);
        assert_eq!(p.history("Tech")[0].value, 18.0);

        // NaN scalars are not recorded
        let mut mean = RiskParamDef::new("m", price(Aggregate::Mean)).with_graph();
        assert_eq!(mean.run("Empty", &[], &ctx()), ParamValue::NotANumber);
        assert!(mean.history("Empty").is_empty());
    }

    #[test]
    fn bound_lookup_clamps() {
        let p = RiskParamDef::new("x", price(Aggregate::Sum)).with_bounds(vec![], vec![10.0, 20.0]);
        assert_eq!(p.upper_bound(0), 10.0);
        assert_eq!(p.upper_bound(5), 20.0);
        assert!(p.lower_bound(0).is_nan());
    }
}
