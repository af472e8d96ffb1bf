//! Error types for the Streamline cluster operator

use thiserror::Error;

/// Result type alias for operator operations
pub type Result<T> = std::result::Result<T, OperatorError>;

/// Errors that can occur during operator operations
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    KubeApi(String),
    /// Optimistic-concurrency conflict: the object changed since it was read
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Reconciliation error
    #[error("Reconciliation error: {0}")]
    Reconciliation(String),
    /// Remote admin command or endpoint failed
    #[error("Admin operation failed: {0}")]
    Admin(String),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),
    /// Invalid resource state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl OperatorError {
    /// Whether the error is an optimistic-concurrency conflict that a fresh pass will resolve.
    pub fn is_conflict(&self) -> bool {
        matches!(self, OperatorError::Conflict(_))
    }
}

impl From<kube::Error> for OperatorError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) if resp.code == 409 => OperatorError::Conflict(resp.message),
            kube::Error::Api(resp) if resp.code == 404 => OperatorError::NotFound(resp.message),
            other => OperatorError::KubeApi(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for OperatorError {
    fn from(err: serde_json::Error) -> Self {
        OperatorError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for OperatorError {
    fn from(err: reqwest::Error) -> Self {
        OperatorError::Admin(err.to_string())
    }
}
