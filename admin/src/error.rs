//! Admin error types.

/// Errors that can occur while talking to the administrative endpoint.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("not connected")]
    NotConnected,
}
