//! Error types for formula evaluation, compilation and the scripting bridge.

/// A formula failed to evaluate against one position.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("{0}")]
    Other(String),
}

/// Expression source could not be compiled.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("cannot compile {role} `{source_text}`: {message}")]
pub struct CompileError {
    pub role: crate::expr::ExprRole,
    pub source_text: String,
    pub message: String,
}

impl CompileError {
    pub fn new(
        role: crate::expr::ExprRole,
        source_text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            role,
            source_text: source_text.into(),
            message: message.into(),
        }
    }
}

/// The external scripting bridge failed to produce a value.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum BridgeError {
    #[error("scripting bridge not available")]
    Unavailable,

    #[error("{module}.{function} failed: {message}")]
    Call {
        module: String,
        function: String,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprRole;

    #[test]
    fn display() {
        assert_eq!(
            EvalError::UnknownVariable("beta".into()).to_string(),
            "unknown variable: beta"
        );
        assert_eq!(
            CompileError::new(ExprRole::Filter, "qty >", "unexpected end").to_string(),
            "cannot compile filter `qty >`: unexpected end"
        );
        assert_eq!(
            BridgeError::Call {
                module: "scripts".into(),
                function: "var95".into(),
                message: "timeout".into(),
            }
            .to_string(),
            "scripts.var95 failed: timeout"
        );
    }

    #[test]
    fn is_error() {
        let err: Box<dyn std::error::Error> = Box::new(EvalError::DivisionByZero);
        assert!(err.to_string().contains("zero"));
    }
}
