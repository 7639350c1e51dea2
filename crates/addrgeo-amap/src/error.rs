use addrgeo_core::CollaboratorError;
use thiserror::Error;

const SERVICE: &str = "amap";

/// Errors returned by the AMap client.
#[derive(Debug, Error)]
pub enum AmapError {
    /// Network or TLS failure, or a non-2xx HTTP status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with `"status": "0"`.
    #[error("AMap API error on {endpoint}: {info} ({infocode})")]
    ApiError {
        endpoint: String,
        info: String,
        infocode: String,
    },

    /// The response body did not have the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),
}

impl From<AmapError> for CollaboratorError {
    fn from(err: AmapError) -> Self {
        match err {
            AmapError::Deserialize { .. } => CollaboratorError::Malformed {
                service: SERVICE,
                reason: err.to_string(),
            },
            other => CollaboratorError::Unavailable {
                service: SERVICE,
                reason: other.to_string(),
            },
        }
    }
}
