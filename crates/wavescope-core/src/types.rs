//! Common types for Wavescope
//!
//! Track metadata, playback state, repeat ranges and the in-memory waveform
//! layouts shared between the engine, the generator and visualization code.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Default number of compressed waveform points
pub const DEFAULT_WAVEFORM_POINTS: usize = 2000;

/// Sample rate assumed before a track reports its own
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// A loaded track
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Path the stream was opened from
    pub path: PathBuf,
    /// Total length in seconds
    pub length: f64,
    /// Native sample rate of the stream
    pub sample_rate: u32,
}

/// Playback state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
    OpeningFile,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "Stopped"),
            Self::Playing => write!(f, "Playing"),
            Self::Paused => write!(f, "Paused"),
            Self::OpeningFile => write!(f, "Opening File"),
        }
    }
}

/// Transport buttons the UI may enable
///
/// Always derived from the playback state and whether a track is loaded,
/// never stored independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub can_play: bool,
    pub can_pause: bool,
    pub can_stop: bool,
}

impl Capabilities {
    /// Derive capabilities from the current state
    pub fn derive(state: PlaybackState, has_track: bool) -> Self {
        match state {
            PlaybackState::Stopped => Self {
                can_play: has_track,
                can_pause: false,
                can_stop: false,
            },
            PlaybackState::Playing => Self {
                can_play: false,
                can_pause: true,
                can_stop: true,
            },
            PlaybackState::Paused => Self {
                can_play: has_track,
                can_pause: false,
                can_stop: has_track,
            },
            PlaybackState::OpeningFile => Self::default(),
        }
    }
}

/// Where a position write came from
///
/// Decided once at the call site. Only poller refreshes skip the backend seek,
/// since they are reporting where the backend already is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionOrigin {
    /// User or programmatic seek
    UserSeek,
    /// Periodic refresh from the backend's own position
    PollerRefresh,
    /// Repeat boundary hit, jumping back to the loop anchor
    LoopRestart,
    /// Stop/open resetting the transport
    Transport,
}

impl PositionOrigin {
    /// Whether a write with this origin must be forwarded to the backend
    pub fn issues_seek(self) -> bool {
        !matches!(self, PositionOrigin::PollerRefresh)
    }
}

/// Loop window in seconds, `0 <= start <= end <= length`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepeatRange {
    pub start: f64,
    pub end: f64,
}

impl RepeatRange {
    /// Build a range, rejecting anything outside `[0, length]` or inverted
    pub fn new(start: f64, end: f64, length: f64) -> Option<Self> {
        let valid = start.is_finite()
            && end.is_finite()
            && start >= 0.0
            && start <= end
            && end <= length;
        valid.then_some(Self { start, end })
    }
}

/// A single stereo peak-level pair
///
/// `#[repr(C)]` keeps the layout `[left, right]` so a `&[StereoLevel]` can be
/// viewed as the interleaved `&[f32]` visualization code expects.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoLevel {
    pub left: f32,
    pub right: f32,
}

impl StereoLevel {
    #[inline]
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Per-channel maximum of two pairs
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self {
            left: self.left.max(other.left),
            right: self.right.max(other.right),
        }
    }
}

/// Compressed waveform published to visualizations
///
/// Fixed length of `points` pairs (interleaved left/right, `2 * points` floats).
/// Immutable once published; clones share the same allocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformBuffer {
    levels: Arc<[StereoLevel]>,
}

impl WaveformBuffer {
    pub fn new(levels: Vec<StereoLevel>) -> Self {
        Self {
            levels: levels.into(),
        }
    }

    /// Number of points (pairs)
    pub fn points(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[StereoLevel] {
        &self.levels
    }

    /// Interleaved `[l0, r0, l1, r1, ...]` view, `2 * points()` floats long
    pub fn as_interleaved(&self) -> &[f32] {
        bytemuck::cast_slice(&self.levels)
    }

    /// Whether two buffers share the same allocation
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.levels, &other.levels)
    }
}

/// Every per-frame peak pair of the last completed generation (not downsampled)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullLevelBuffer {
    pub path: PathBuf,
    pub frame_seconds: f64,
    pub levels: Arc<[StereoLevel]>,
}

impl FullLevelBuffer {
    /// Number of frames
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn as_interleaved(&self) -> &[f32] {
        bytemuck::cast_slice(&self.levels)
    }
}

/// FFT sizes the backend can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FftSize {
    Fft256,
    Fft512,
    Fft1024,
    #[default]
    Fft2048,
    Fft4096,
    Fft8192,
}

impl FftSize {
    /// Number of input samples per transform
    pub fn samples(self) -> usize {
        match self {
            FftSize::Fft256 => 256,
            FftSize::Fft512 => 512,
            FftSize::Fft1024 => 1024,
            FftSize::Fft2048 => 2048,
            FftSize::Fft4096 => 4096,
            FftSize::Fft8192 => 8192,
        }
    }

    /// Number of magnitude bins returned (`samples / 2`)
    pub fn bins(self) -> usize {
        self.samples() / 2
    }
}
