//! Result types for risk evaluation.
//!
//! With the `serde` feature these serialize to the nested-array shape the
//! risk GUI consumes:
//!
//! - [`GroupValue`]: `[group, value]` or `[group, value, breach]`
//! - [`Breach`]: `[-1]`, `[1]`, or with a trade stop `[-1, true]` / `[1, true]`
//! - [`ParamValue`]: a number, the string `"NaN"`, a list of ranked entries,
//!   or `null`
//! - [`RunResult`]: a flat list (one parameter) or an object keyed by
//!   parameter name

use std::collections::BTreeMap;

/// Marker emitted in place of a NaN scalar, which JSON cannot carry.
pub const NAN_MARKER: &str = "NaN";

/// Which bound was crossed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BreachSide {
    /// Strictly below the lower bound.
    Below,
    /// Strictly above the upper bound.
    Above,
}

impl BreachSide {
    /// `-1` for below, `+1` for above.
    pub fn sign(self) -> i8 {
        match self {
            BreachSide::Below => -1,
            BreachSide::Above => 1,
        }
    }
}

/// A bound breach, optionally flagged as having triggered a trade stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Breach {
    pub side: BreachSide,
    pub trade_stop: bool,
}

impl Breach {
    pub fn new(side: BreachSide) -> Self {
        Self {
            side,
            trade_stop: false,
        }
    }

    /// Classify `value` against `[lower, upper]`.
    ///
    /// Strict comparisons: a value equal to a bound does not breach. NaN
    /// bounds (and NaN values) never breach.
    pub fn classify(value: f64, lower: f64, upper: f64) -> Option<Self> {
        if value < lower {
            Some(Breach::new(BreachSide::Below))
        } else if value > upper {
            Some(Breach::new(BreachSide::Above))
        } else {
            None
        }
    }
}

/// One `(label, value)` entry of a ranked (`top`) result.
#[derive(Clone, Debug, PartialEq)]
pub struct RankedEntry {
    pub label: String,
    pub value: f64,
    pub breach: Option<Breach>,
}

impl RankedEntry {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            breach: None,
        }
    }
}

/// Value of one parameter for one group.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Number(f64),
    /// Undefined scalar (empty group, NaN inputs). Serialized as `"NaN"`.
    NotANumber,
    /// Ranked per-position values, produced by `top`.
    Ranked(Vec<RankedEntry>),
    /// No value at all, e.g. the scripting bridge failed.
    Absent,
}

impl ParamValue {
    /// Wrap a scalar, mapping NaN to [`ParamValue::NotANumber`].
    pub fn scalar(value: f64) -> Self {
        if value.is_nan() {
            ParamValue::NotANumber
        } else {
            ParamValue::Number(value)
        }
    }

    /// The scalar value, if this is a finite-or-infinite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_ranked(&self) -> Option<&[RankedEntry]> {
        match self {
            ParamValue::Ranked(entries) => Some(entries),
            _ => None,
        }
    }

    /// Convert to a value a formula can read as a variable.
    ///
    /// [`ParamValue::Absent`] has no variable representation.
    pub fn into_variable(self) -> Option<crate::expr::EvalValue> {
        use crate::expr::EvalValue;
        match self {
            ParamValue::Number(v) => Some(EvalValue::Number(v)),
            ParamValue::NotANumber => Some(EvalValue::Number(f64::NAN)),
            ParamValue::Ranked(entries) => Some(EvalValue::Ranked(entries)),
            ParamValue::Absent => None,
        }
    }
}

/// One emitted `(group, value[, breach])` row.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupValue {
    pub group: String,
    pub value: ParamValue,
    pub breach: Option<Breach>,
}

/// Output of a full risk definition pass.
#[derive(Clone, Debug, PartialEq)]
pub enum RunResult {
    /// The definition has exactly one parameter.
    Single(Vec<GroupValue>),
    /// Parameter name to rows, only parameters that produced rows.
    ByParameter(BTreeMap<String, Vec<GroupValue>>),
}

impl RunResult {
    /// Rows for `parameter`. A single-parameter result answers for any name.
    pub fn rows(&self, parameter: &str) -> Option<&[GroupValue]> {
        match self {
            RunResult::Single(rows) => Some(rows),
            RunResult::ByParameter(map) => map.get(parameter).map(Vec::as_slice),
        }
    }

    /// Every row, across parameters.
    pub fn iter_rows(&self) -> Box<dyn Iterator<Item = &GroupValue> + '_> {
        match self {
            RunResult::Single(rows) => Box::new(rows.iter()),
            RunResult::ByParameter(map) => Box::new(map.values().flatten()),
        }
    }

    /// Rows carrying a breach.
    pub fn breaches(&self) -> impl Iterator<Item = &GroupValue> {
        self.iter_rows().filter(|row| row.breach.is_some())
    }
}

#[cfg(feature = "serde")]
mod ser {
    use serde::ser::{SerializeSeq, Serializer};
    use serde::Serialize;

    use super::*;

    impl Serialize for Breach {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let len = if self.trade_stop { 2 } else { 1 };
            let mut seq = serializer.serialize_seq(Some(len))?;
            seq.serialize_element(&self.side.sign())?;
            if self.trade_stop {
                seq.serialize_element(&true)?;
            }
            seq.end()
        }
    }

    impl Serialize for RankedEntry {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let len = if self.breach.is_some() { 3 } else { 2 };
            let mut seq = serializer.serialize_seq(Some(len))?;
            seq.serialize_element(&self.label)?;
            seq.serialize_element(&self.value)?;
            if let Some(breach) = &self.breach {
                seq.serialize_element(breach)?;
            }
            seq.end()
        }
    }

    impl Serialize for ParamValue {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                ParamValue::Number(v) => serializer.serialize_f64(*v),
                ParamValue::NotANumber => serializer.serialize_str(NAN_MARKER),
                ParamValue::Ranked(entries) => entries.serialize(serializer),
                ParamValue::Absent => serializer.serialize_none(),
            }
        }
    }

    impl Serialize for GroupValue {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let len = if self.breach.is_some() { 3 } else { 2 };
            let mut seq = serializer.serialize_seq(Some(len))?;
            seq.serialize_element(&self.group)?;
            seq.serialize_element(&self.value)?;
            if let Some(breach) = &self.breach {
                seq.serialize_element(breach)?;
            }
            seq.end()
        }
    }

    impl Serialize for RunResult {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                RunResult::Single(rows) => rows.serialize(serializer),
                RunResult::ByParameter(map) => map.serialize(serializer),
            }
        }
    }
}
