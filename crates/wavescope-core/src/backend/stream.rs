//! Scoped decode-only stream

use std::path::Path;

use super::{AudioBackend, BackendResult, StreamHandle};

/// A decode-only stream that is freed when dropped
///
/// The waveform worker can bail out of a run at any frame (cancellation,
/// decode error); tying the free to scope keeps every exit path clean.
pub struct DecodeStream<'a> {
    backend: &'a dyn AudioBackend,
    handle: StreamHandle,
}

impl<'a> DecodeStream<'a> {
    pub fn open(backend: &'a dyn AudioBackend, path: &Path) -> BackendResult<Self> {
        let handle = backend.create_decode_stream(path)?;
        Ok(Self { backend, handle })
    }

    pub fn handle(&self) -> StreamHandle {
        self.handle
    }

    /// Total decoded length in seconds
    pub fn length(&self) -> BackendResult<f64> {
        self.backend.length(self.handle)
    }

    /// Peak pair of the next `window_seconds` of decoded audio
    pub fn next_levels(&self, window_seconds: f64) -> BackendResult<crate::types::StereoLevel> {
        self.backend.levels(self.handle, window_seconds)
    }
}

impl Drop for DecodeStream<'_> {
    fn drop(&mut self) {
        self.backend.free(self.handle);
    }
}
