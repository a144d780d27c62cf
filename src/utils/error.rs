//! Error types and handling
//!
//! Common error types used across the application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Acquisition error: {0}")]
    Acquire(#[from] crate::capture::AcquireError),

    #[error("Recorder error: {0}")]
    Recorder(#[from] crate::recorder::RecorderError),

    #[error("Channel error: {0}")]
    Channel(#[from] crate::channel::ChannelError),

    #[error("Session error: {0}")]
    Session(#[from] crate::session::SessionError),

    #[error("Packaging error: {0}")]
    Packaging(#[from] crate::packager::PackagingError),
}

/// Error response for a host/UI boundary
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Acquire(_) => "ACQUIRE_ERROR",
            AppError::Recorder(_) => "RECORDER_ERROR",
            AppError::Channel(_) => "CHANNEL_ERROR",
            AppError::Session(_) => "SESSION_ERROR",
            AppError::Packaging(_) => "PACKAGING_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
