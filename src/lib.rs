//! # openrisk
//!
//! Shared kernel for portfolio risk evaluation.
//!
//! This crate holds what every part of the risk stack agrees on:
//!
//! - **Positions**: [`Position`], [`Security`] and account identity
//! - **Formulas**: the [`Expression`] contract, reducer kinds ([`Aggregate`])
//!   and the collaborator traits for compiling source text
//!   ([`ExpressionCompiler`]) and for `call` formulas ([`ScriptBridge`])
//! - **Aggregators**: `sum`, `mean`, population `std`, `len` and ranked
//!   `top-N` in [`stats`]
//! - **Results**: [`ParamValue`], [`Breach`], [`GroupValue`], [`RunResult`]
//!
//! The grouping and breach engine lives in `openrisk-risk`.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use openrisk::{AccountId, Aggregate, Expression, FnExpression, Position, Security, Variables};
//!
//! let gross = FnExpression::numeric("sum(abs(mv))", Aggregate::Sum, |p, _| {
//!     p.market_value().abs()
//! });
//! let aapl = Arc::new(Security::new("AAPL"));
//! let pos = Position::new(aapl, AccountId(1), -10.0, 150.0);
//!
//! let v = gross.evaluate(&pos, &Variables::default()).unwrap();
//! assert_eq!(v.as_number(), Some(1_500.0));
//! ```
//!
//! ## Aggregators
//!
//! ```
//! use openrisk::stats;
//!
//! let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
//! assert_eq!(stats::std(&xs), 2.0);
//! assert!(stats::mean(&[]).is_nan());
//!
//! let ranked = stats::top_n(
//!     [("A", 5.0), ("B", 1.0), ("C", 9.0)].map(|(l, v)| (l.to_string(), v)),
//!     2,
//! );
//! assert_eq!(ranked[0].label, "C");
//! assert_eq!(ranked.len(), 2);
//! ```

mod error;
pub mod expr;
mod result;
pub mod stats;
mod types;

// Re-export public API
pub use error::{BridgeError, CompileError, EvalError};
pub use expr::{
    Aggregate, CallSpec, CompileRequest, EvalValue, ExprRole, Expression, ExpressionCompiler,
    ExpressionTable, FnExpression, NoBridge, ScriptBridge, Variables,
};
pub use result::{
    Breach, BreachSide, GroupValue, NAN_MARKER, ParamValue, RankedEntry, RunResult,
};
pub use types::{AccountDirectory, AccountId, AccountNames, Position, Security};
