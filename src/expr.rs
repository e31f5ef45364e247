//! Formula contracts.
//!
//! The expression language itself lives outside this crate. The risk engine
//! only needs something it can ask "which reducer do you use?" and "what is
//! your value for this position, given these variables?". Compilation and the
//! scripting bridge for `call` formulas are likewise collaborator traits.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{BridgeError, CompileError, EvalError};
use crate::result::{ParamValue, RankedEntry};
use crate::types::Position;

/// Named values visible to a formula while it is evaluated.
pub type Variables = FxHashMap<String, EvalValue>;

/// A value produced by evaluating an expression.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalValue {
    Number(f64),
    Bool(bool),
    /// Ranked `(label, value)` list, produced by aggregate `top` variables.
    Ranked(Vec<RankedEntry>),
}

impl EvalValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            EvalValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            EvalValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            EvalValue::Number(_) => "number",
            EvalValue::Bool(_) => "bool",
            EvalValue::Ranked(_) => "ranked list",
        }
    }
}

impl From<f64> for EvalValue {
    fn from(v: f64) -> Self {
        EvalValue::Number(v)
    }
}

impl From<bool> for EvalValue {
    fn from(b: bool) -> Self {
        EvalValue::Bool(b)
    }
}

/// Target of a `call` formula in the external scripting runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSpec {
    pub module: String,
    pub function: String,
    pub args: String,
}

/// How per-position values of a formula are reduced over a group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Aggregate {
    /// Per-position formula, no reducer.
    #[default]
    None,
    Sum,
    Mean,
    /// Population standard deviation.
    Std,
    Len,
    /// Ranked list: `N > 0` keeps the N largest, `N < 0` the |N| smallest,
    /// `0` keeps everything in evaluation order.
    Top(i32),
    /// Delegated wholesale to the scripting bridge.
    Call(CallSpec),
}

impl Aggregate {
    /// Reducer used for a top-level formula that names none.
    pub const DEFAULT_TOP: Aggregate = Aggregate::Top(10);

    /// Reducer tag as written in formula source.
    pub fn tag(&self) -> &'static str {
        match self {
            Aggregate::None => "",
            Aggregate::Sum => "sum",
            Aggregate::Mean => "mean",
            Aggregate::Std => "std",
            Aggregate::Len => "len",
            Aggregate::Top(_) => "top",
            Aggregate::Call(_) => "call",
        }
    }

    /// Parse a reducer tag. `n` is only used by `top`; `call` needs a
    /// [`CallSpec`] and is not constructible from a tag.
    pub fn from_tag(tag: &str, n: i32) -> Option<Self> {
        match tag {
            "" => Some(Aggregate::None),
            "sum" => Some(Aggregate::Sum),
            "mean" => Some(Aggregate::Mean),
            "std" => Some(Aggregate::Std),
            "len" => Some(Aggregate::Len),
            "top" => Some(Aggregate::Top(n)),
            _ => None,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        !matches!(self, Aggregate::None)
    }
}

/// A compiled formula.
///
/// For aggregate expressions (`sum(qty * price)`), [`evaluate`](Self::evaluate)
/// yields the per-position operand; reducing over the group is the engine's
/// job, driven by [`aggregate`](Self::aggregate).
pub trait Expression: fmt::Debug + Send + Sync {
    /// Source text, used for diagnostics and default group names.
    fn source(&self) -> &str;

    fn aggregate(&self) -> &Aggregate;

    fn evaluate(&self, position: &Position, vars: &Variables) -> Result<EvalValue, EvalError>;

    fn is_aggregate(&self) -> bool {
        self.aggregate().is_aggregate()
    }
}

type EvalFn = dyn Fn(&Position, &Variables) -> Result<EvalValue, EvalError> + Send + Sync;

/// Closure-backed [`Expression`] for formulas defined in Rust.
pub struct FnExpression {
    source: String,
    aggregate: Aggregate,
    f: Box<EvalFn>,
}

impl FnExpression {
    pub fn new<F>(source: impl Into<String>, aggregate: Aggregate, f: F) -> Self
    where
        F: Fn(&Position, &Variables) -> Result<EvalValue, EvalError> + Send + Sync + 'static,
    {
        Self {
            source: source.into(),
            aggregate,
            f: Box::new(f),
        }
    }

    /// Numeric formula that cannot fail.
    pub fn numeric<F>(source: impl Into<String>, aggregate: Aggregate, f: F) -> Self
    where
        F: Fn(&Position, &Variables) -> f64 + Send + Sync + 'static,
    {
        Self::new(source, aggregate, move |p, vars| Ok(EvalValue::Number(f(p, vars))))
    }

    /// Boolean per-position expression, as used by filters and group selectors.
    pub fn predicate<F>(source: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Position) -> bool + Send + Sync + 'static,
    {
        Self::new(source, Aggregate::None, move |p, _| Ok(EvalValue::Bool(f(p))))
    }

    pub fn into_arc(self) -> Arc<dyn Expression> {
        Arc::new(self)
    }
}

impl fmt::Debug for FnExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnExpression")
            .field("source", &self.source)
            .field("aggregate", &self.aggregate)
            .finish_non_exhaustive()
    }
}

impl Expression for FnExpression {
    fn source(&self) -> &str {
        &self.source
    }

    fn aggregate(&self) -> &Aggregate {
        &self.aggregate
    }

    fn evaluate(&self, position: &Position, vars: &Variables) -> Result<EvalValue, EvalError> {
        (self.f)(position, vars)
    }
}

/// What a piece of source text is compiled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ExprRole {
    Formula,
    Filter,
    Group,
    Variable,
}

impl fmt::Display for ExprRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprRole::Formula => write!(f, "formula"),
            ExprRole::Filter => write!(f, "filter"),
            ExprRole::Group => write!(f, "group"),
            ExprRole::Variable => write!(f, "variable"),
        }
    }
}

/// Everything a compiler gets to know about one source snippet.
#[derive(Clone, Copy, Debug)]
pub struct CompileRequest<'a> {
    pub source: &'a str,
    pub role: ExprRole,
    /// The expression must produce a boolean (filters, group predicates).
    pub boolean: bool,
    /// Variable names declared so far; they shadow any same-named binding.
    pub variables: &'a [String],
    /// Module path handed to `call` formulas.
    pub module_path: &'a str,
}

/// Turns formula source into a compiled [`Expression`].
pub trait ExpressionCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<Arc<dyn Expression>, CompileError>;
}

/// Compiler backed by a table of precompiled expressions keyed by source.
///
/// The literal `true` is always registered, so the match-all group selector
/// (`*`) resolves without extra setup.
#[derive(Clone, Debug)]
pub struct ExpressionTable {
    entries: FxHashMap<String, Arc<dyn Expression>>,
}

impl ExpressionTable {
    pub fn new() -> Self {
        let mut entries: FxHashMap<String, Arc<dyn Expression>> = FxHashMap::default();
        entries.insert(
            "true".into(),
            FnExpression::predicate("true", |_| true).into_arc(),
        );
        Self { entries }
    }

    /// Register an expression under its own source text.
    pub fn insert(&mut self, expr: Arc<dyn Expression>) {
        self.entries.insert(expr.source().to_string(), expr);
    }

    pub fn with(mut self, expr: FnExpression) -> Self {
        self.insert(expr.into_arc());
        self
    }

    pub fn get(&self, source: &str) -> Option<&Arc<dyn Expression>> {
        self.entries.get(source)
    }
}

impl Default for ExpressionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionCompiler for ExpressionTable {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<Arc<dyn Expression>, CompileError> {
        self.entries
            .get(request.source.trim())
            .cloned()
            .ok_or_else(|| CompileError::new(request.role, request.source, "unknown expression"))
    }
}

/// Bridge to an external scripting runtime for `call` formulas.
pub trait ScriptBridge {
    fn call(
        &self,
        spec: &CallSpec,
        positions: &[&Position],
        module_path: &str,
    ) -> Result<ParamValue, BridgeError>;
}

/// Bridge that rejects every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBridge;

impl ScriptBridge for NoBridge {
    fn call(&self, _: &CallSpec, _: &[&Position], _: &str) -> Result<ParamValue, BridgeError> {
        Err(BridgeError::Unavailable)
    }
}
