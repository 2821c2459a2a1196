//! Audio backend error types

use std::path::PathBuf;

use thiserror::Error;

use super::StreamHandle;

/// Errors reported by an audio backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Path does not resolve to a file
    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),

    /// Native stream could not be created (unsupported format, device error, ...)
    #[error("Failed to create stream for {path:?}: {reason}")]
    StreamCreation { path: PathBuf, reason: String },

    /// Handle is not (or no longer) known to the backend
    #[error("Invalid stream handle: {0}")]
    InvalidHandle(StreamHandle),

    /// Boundary callback could not be registered
    #[error("Failed to register boundary callback: {0}")]
    CallbackRegistration(String),

    /// Reported length is negative or not finite
    #[error("Invalid stream length: {0}")]
    InvalidLength(f64),

    /// Decoding failed mid-stream
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;
