//! Error taxonomy for the try-on workflow

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TryOnError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Object not found: {bucket}/{key}")]
    StorageNotFound { bucket: String, key: String },

    #[error("Object store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Inference backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Failed to fetch inference result: {0}")]
    ResultFetchFailed(String),

    #[error("Deadline of {timeout:?} exceeded during {operation}")]
    DeadlineExceeded {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Local artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TryOnError {
    /// Stable machine-readable code, used in API error payloads
    pub fn code(&self) -> &'static str {
        match self {
            TryOnError::BadRequest(_) => "BAD_REQUEST",
            TryOnError::StorageNotFound { .. } => "STORAGE_NOT_FOUND",
            TryOnError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            TryOnError::BackendUnreachable(_) => "BACKEND_UNREACHABLE",
            TryOnError::InferenceFailed(_) => "INFERENCE_FAILED",
            TryOnError::ResultFetchFailed(_) => "RESULT_FETCH_FAILED",
            TryOnError::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            TryOnError::Io(_) => "LOCAL_IO",
        }
    }

    /// Whether retrying the whole request may succeed.
    /// The service itself never retries.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TryOnError::StorageUnavailable(_)
            | TryOnError::BackendUnreachable(_)
            | TryOnError::ResultFetchFailed(_)
            | TryOnError::DeadlineExceeded { .. }
            | TryOnError::Io(_) => true,
            TryOnError::BadRequest(_)
            | TryOnError::StorageNotFound { .. }
            | TryOnError::InferenceFailed(_) => false,
        }
    }

    pub fn is_bad_request(&self) -> bool {
        matches!(self, TryOnError::BadRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, TryOnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_split() {
        assert!(TryOnError::StorageUnavailable("down".into()).is_recoverable());
        assert!(TryOnError::DeadlineExceeded {
            operation: "inference",
            timeout: Duration::from_secs(1),
        }
        .is_recoverable());
        assert!(!TryOnError::BadRequest("missing".into()).is_recoverable());
        assert!(!TryOnError::InferenceFailed("no result".into()).is_recoverable());
    }

    #[test]
    fn test_not_found_message() {
        let err = TryOnError::StorageNotFound {
            bucket: "garments".into(),
            key: "def.jpg".into(),
        };
        assert_eq!(err.to_string(), "Object not found: garments/def.jpg");
        assert_eq!(err.code(), "STORAGE_NOT_FOUND");
    }
}
