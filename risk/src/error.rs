use openrisk::CompileError;

/// Failure to build a risk definition from configuration.
///
/// Only definition building fails hard; evaluation never does.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("risk `{risk}`: {source}")]
    Compile {
        risk: String,
        #[source]
        source: CompileError,
    },

    #[error("risk `{risk}`: parameter `{parameter}` has no formula")]
    MissingFormula { risk: String, parameter: String },
}

impl BuildError {
    /// Name of the risk definition that failed to build.
    pub fn risk(&self) -> &str {
        match self {
            BuildError::Compile { risk, .. } | BuildError::MissingFormula { risk, .. } => risk,
        }
    }
}
