//! Service operation errors
//!
//! Shared error type for every external collaborator client. The API crate
//! maps these into `AppError` variants per pipeline stage.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{service} returned status {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} returned an empty result")]
    EmptyResult { service: &'static str },

    #[error("{service} response missing {field}")]
    MalformedResponse {
        service: &'static str,
        field: &'static str,
    },

    #[error("timed out after {attempts} polls waiting for {service}")]
    Timeout { service: &'static str, attempts: u32 },

    #[error("cancelled while waiting for {service}")]
    Cancelled { service: &'static str },
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// True when the failure was the bounded-poll budget running out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ServiceError::Timeout { .. })
    }
}
