//! Wavescope Core - Playback engine feeding waveform and spectrum visualizations
//!
//! The engine keeps three activities consistent:
//!
//! - a playback state machine driven by UI commands ([`engine::PlaybackEngine`])
//! - a background worker that decodes a whole file and max-pools its amplitude
//!   envelope into a fixed-size waveform ([`waveform::WaveformGenerator`])
//! - periodic position polling and boundary callbacks (end-of-track, loop repeat)
//!
//! All engine state lives in the owning context. Worker threads and backend
//! callbacks only ever send messages into the engine's inbox, which the owner
//! drains with [`engine::PlaybackEngine::process_pending`].

pub mod backend;
pub mod config;
pub mod engine;
pub mod spectrum;
pub mod types;
pub mod waveform;

#[cfg(test)]
pub(crate) mod testing;

pub use types::*;
