//! Audio backend contract
//!
//! The native decode/playback backend is an external collaborator. The engine
//! only needs the operations below, expressed in seconds so the engine never
//! deals with byte offsets or sample formats.
//!
//! # Threading
//!
//! Backends are shared between the owning context (transport commands,
//! spectrum reads) and the waveform worker (decode-only streams), so they must
//! be `Send + Sync`. Boundary callbacks are invoked on a backend-owned thread;
//! the engine's callbacks only forward a message into its inbox.

mod error;
mod stream;

pub use error::{BackendError, BackendResult};
pub use stream::DecodeStream;

use std::path::Path;

use crate::types::{FftSize, StereoLevel};

/// Backend-side identifier for an open decode or playback stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(pub u64);

impl std::fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// Identifier of a registered boundary callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(pub u64);

/// When a boundary callback fires
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryTrigger {
    /// Playback crosses this offset in seconds
    Position(f64),
    /// Playback reaches the end of the stream
    End,
}

/// Callback invoked by the backend when a boundary is crossed
pub type BoundaryCallback = Box<dyn Fn() + Send + Sync + 'static>;

/// Minimum contract the engine consumes from a native audio backend
pub trait AudioBackend: Send + Sync {
    /// Open a stream for playback on the output device
    fn open_stream(&self, path: &Path) -> BackendResult<StreamHandle>;

    /// Open a decode-only stream (no output device) for offline analysis
    fn create_decode_stream(&self, path: &Path) -> BackendResult<StreamHandle>;

    /// Total stream length in seconds
    fn length(&self, handle: StreamHandle) -> BackendResult<f64>;

    /// Current position in seconds
    fn position(&self, handle: StreamHandle) -> BackendResult<f64>;

    /// Native sample rate of the stream
    fn sample_rate(&self, handle: StreamHandle) -> BackendResult<u32>;

    fn seek(&self, handle: StreamHandle, seconds: f64) -> BackendResult<()>;

    /// Start or resume playback
    fn play(&self, handle: StreamHandle) -> BackendResult<()>;

    fn pause(&self, handle: StreamHandle) -> BackendResult<()>;

    fn stop(&self, handle: StreamHandle) -> BackendResult<()>;

    /// Release a stream. Unknown handles are ignored.
    fn free(&self, handle: StreamHandle);

    /// Peak level pair over the next `window_seconds` of audio
    ///
    /// On a playback stream this meters what is currently audible. On a
    /// decode stream it consumes `window_seconds` of decoded audio, so
    /// successive calls walk the file frame by frame.
    fn levels(&self, handle: StreamHandle, window_seconds: f64) -> BackendResult<StereoLevel>;

    /// Fill `buffer` with FFT magnitudes of the current audio block
    ///
    /// Returns false when no data was available (unknown stream, or not
    /// enough new samples since the last call).
    fn fft_data(&self, handle: StreamHandle, fft_size: FftSize, buffer: &mut [f32]) -> bool;

    fn register_boundary_callback(
        &self,
        handle: StreamHandle,
        trigger: BoundaryTrigger,
        callback: BoundaryCallback,
    ) -> BackendResult<CallbackId>;

    fn remove_callback(&self, handle: StreamHandle, id: CallbackId);
}
