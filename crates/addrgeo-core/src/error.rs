use thiserror::Error;

/// Failure reported by an external collaborator (gazetteer, place search,
/// structuring model, auxiliary judge).
///
/// The resolver never propagates these: every variant degrades the current
/// cascade stage to an empty result.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Network failure, non-2xx status, or an API-level error envelope.
    #[error("{service} unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },

    /// The call did not finish inside its time budget.
    #[error("{service} timed out after {timeout_ms}ms")]
    Timeout {
        service: &'static str,
        timeout_ms: u64,
    },

    /// The collaborator answered, but not in a shape we can use.
    #[error("malformed response from {service}: {reason}")]
    Malformed {
        service: &'static str,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
