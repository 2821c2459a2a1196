//! Playback engine tunables

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{FftSize, DEFAULT_WAVEFORM_POINTS};

/// Configuration for [`crate::engine::PlaybackEngine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of compressed waveform points (the buffer holds twice as many floats)
    /// 0 disables waveform generation.
    /// Default: 2000
    pub waveform_point_count: usize,

    /// Length of one full-resolution frame in seconds
    /// Default: 0.02 (20ms)
    pub frame_seconds: f64,

    /// Publish a partial waveform every N decoded frames
    /// Only affects how often the UI sees progressive refinement.
    /// Default: 1500
    pub partial_publish_frames: usize,

    /// Position polling period while playing, in milliseconds
    /// Default: 100
    pub position_poll_interval_ms: u64,

    /// FFT size for spectrum reads and frequency-to-bin mapping
    /// Default: Fft2048
    pub fft_size: FftSize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            waveform_point_count: DEFAULT_WAVEFORM_POINTS,
            frame_seconds: 0.02,
            partial_publish_frames: 1500,
            position_poll_interval_ms: 100,
            fft_size: FftSize::Fft2048,
        }
    }
}

impl EngineConfig {
    /// Replace values the engine cannot run with by their defaults
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if !(self.frame_seconds.is_finite() && self.frame_seconds > 0.0) {
            log::warn!(
                "Invalid frame_seconds {}, using {}",
                self.frame_seconds,
                defaults.frame_seconds
            );
            self.frame_seconds = defaults.frame_seconds;
        }
        if self.position_poll_interval_ms == 0 {
            log::warn!(
                "position_poll_interval_ms must be positive, using {}",
                defaults.position_poll_interval_ms
            );
            self.position_poll_interval_ms = defaults.position_poll_interval_ms;
        }
        self.partial_publish_frames = self.partial_publish_frames.max(1);
        self
    }

    pub fn position_poll_interval(&self) -> Duration {
        Duration::from_millis(self.position_poll_interval_ms)
    }
}
