use std::path::PathBuf;

use addrgeo_core::CollaboratorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("{service} returned no content")]
    EmptyResponse { service: &'static str },

    #[error("unusable {service} output: {reason}")]
    Malformed {
        service: &'static str,
        reason: String,
    },

    #[error("failed to read prompt template {}: {source}", path.display())]
    Prompt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LlmError {
    fn service(&self) -> &'static str {
        match self {
            LlmError::Status { service, .. }
            | LlmError::EmptyResponse { service }
            | LlmError::Malformed { service, .. } => service,
            LlmError::Http(_) | LlmError::Prompt { .. } => "llm",
        }
    }
}

impl From<LlmError> for CollaboratorError {
    fn from(err: LlmError) -> Self {
        let service = err.service();
        match err {
            LlmError::EmptyResponse { .. } | LlmError::Malformed { .. } => {
                CollaboratorError::Malformed {
                    service,
                    reason: err.to_string(),
                }
            }
            other => CollaboratorError::Unavailable {
                service,
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_output_maps_to_malformed() {
        let err: CollaboratorError = LlmError::Malformed {
            service: "chat",
            reason: "not an object".into(),
        }
        .into();
        assert!(matches!(err, CollaboratorError::Malformed { service: "chat", .. }));

        let err: CollaboratorError = LlmError::EmptyResponse { service: "tgi" }.into();
        assert!(matches!(err, CollaboratorError::Malformed { service: "tgi", .. }));
    }

    #[test]
    fn bad_status_maps_to_unavailable() {
        let err: CollaboratorError = LlmError::Status {
            service: "tgi",
            status: 503,
        }
        .into();
        assert!(matches!(err, CollaboratorError::Unavailable { service: "tgi", .. }));
    }
}
