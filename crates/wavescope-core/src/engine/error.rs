//! Playback engine error types

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::BackendError;

/// Errors returned synchronously by engine commands
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Path does not resolve to a file
    #[error("File not found: {0:?}")]
    FileNotFound(PathBuf),

    /// The backend could not create a playback stream
    #[error("Failed to create playback stream for {path:?}: {source}")]
    BackendStreamCreationFailed {
        path: PathBuf,
        #[source]
        source: BackendError,
    },

    /// End-of-track or repeat boundary could not be registered
    #[error("Failed to register boundary callback: {0}")]
    BoundaryCallbackRegistrationFailed(#[source] BackendError),

    /// Command needs a loaded track
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Repeat range outside `0 <= start <= end <= length`
    #[error("Invalid repeat range {start}..{end}s for a {length}s track")]
    InvalidRepeatRange { start: f64, end: f64, length: f64 },
}

/// Result type for engine commands
pub type EngineResult<T> = Result<T, EngineError>;
