//! Named sub-expressions ("variables") available to a formula.
//!
//! Aggregate variables (`mean(px)`) are reduced once per group, before the
//! per-position pass, and may see the aggregate variables declared before
//! them. Per-position variables are re-evaluated for every position inside
//! the formula's pass and see everything resolved so far. A later binding of
//! the same name overwrites an earlier one.

use std::sync::Arc;

use log::debug;
use openrisk::{Expression, Position, Variables};

use crate::diagnostics::Diagnostics;
use crate::param::{EvalContext, reduce};

/// A variable binding: `name = expression`.
#[derive(Clone, Debug)]
pub struct NamedExpression {
    pub name: String,
    pub expr: Arc<dyn Expression>,
}

impl NamedExpression {
    pub fn new(name: impl Into<String>, expr: Arc<dyn Expression>) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.expr.is_aggregate()
    }
}

/// Reduce every aggregate variable over `positions`, in declaration order.
pub(crate) fn resolve_aggregates(
    variables: &[NamedExpression],
    positions: &[&Position],
    ctx: &EvalContext<'_>,
    diag: &mut Diagnostics,
) -> Variables {
    let mut scope = Variables::default();
    for var in variables.iter().filter(|v| v.is_aggregate()) {
        let value = reduce(
            var.expr.as_ref(),
            var.expr.aggregate(),
            positions,
            &mut scope,
            &[],
            ctx,
            diag,
        );
        match value.into_variable() {
            Some(v) => {
                scope.insert(var.name.clone(), v);
            }
            None => {
                scope.remove(&var.name);
            }
        }
    }
    scope
}

/// Bind every per-position variable for `position` into `scope`.
///
/// A failing variable is bound to NaN so formulas referencing it degrade the
/// same way a failing formula does.
pub(crate) fn resolve_per_position(
    variables: &[NamedExpression],
    position: &Position,
    scope: &mut Variables,
    diag: &mut Diagnostics,
) {
    for var in variables.iter().filter(|v| !v.is_aggregate()) {
        let value = match var.expr.evaluate(position, scope) {
            Ok(v) => v,
            Err(e) => {
                debug!(
                    "variable {} degraded for {}: {e}",
                    var.name, position.security.symbol
                );
                diag.degraded_variables += 1;
                f64::NAN.into()
            }
        };
        scope.insert(var.name.clone(), value);
    }
}
