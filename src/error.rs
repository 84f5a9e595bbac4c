//! Error types for the vplan service.
//!
//! All errors carry stable string messages suitable for logs and for
//! display to operators. Fetch and storage errors are degraded to empty
//! results at the query boundary; only validation errors reach clients
//! as typed responses.

/// Top-level error type for the substitution-plan service.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Malformed request input (date parameters).
    #[error("validation error: {0}")]
    Validation(String),

    /// Upstream fetch failure: network error, non-200 status, redirect,
    /// or timeout.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Failed to parse the upstream HTML response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Cache store read/write/serialization failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// HTTP server lifecycle error (bind, local address).
    #[error("server error: {0}")]
    Server(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PlanError>;
