//! Waveform data for timeline displays
//!
//! - [`downsample`]: max-pooling of per-frame peak levels into a fixed point count
//! - [`generator`]: the background worker that decodes files and publishes
//!   progressively refined waveform buffers

pub mod downsample;
pub mod generator;

pub use downsample::{boundary_indices, downsample, Downsampler};
pub use generator::{
    GenerationError, GenerationRequest, GeneratorSettings, WaveformGenerator, WaveformMessage,
};
