// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    /// Payload could not be turned into canonical JSON, so no fingerprint exists.
    #[error("Unserializable payload: {0}")]
    UnserializablePayload(#[from] serde_json::Error),

    /// The shared lock store could not complete the request. Retryable.
    #[error("Lock store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unknown job type: {0}")]
    UnknownJobType(String),
}

impl AppError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
