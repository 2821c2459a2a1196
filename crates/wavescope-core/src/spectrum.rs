//! Spectrum data access for analyzer displays
//!
//! Visualizations pull FFT magnitudes at their own frame rate; nothing here
//! mutates engine state.

use crate::types::FftSize;

/// Read-only FFT access implemented by [`crate::engine::PlaybackEngine`]
pub trait SpectrumDataSource {
    /// Fill `buffer` with magnitudes of the current audio block
    ///
    /// The buffer should hold `fft_size.bins()` values. Returns false when
    /// there is no active stream or not enough new samples.
    fn fft_data(&self, buffer: &mut [f32]) -> bool;

    /// Bin index in the magnitude buffer for a frequency in Hz
    fn fft_frequency_index(&self, frequency: u32) -> usize;
}

/// Map a frequency to its FFT bin
///
/// `round(frequency * fft_size / sample_rate)`, clamped to the last bin of the
/// `fft_size / 2` magnitudes.
pub fn fft_frequency_to_index(frequency: u32, fft_size: FftSize, sample_rate: u32) -> usize {
    let last_bin = fft_size.bins().saturating_sub(1);
    if sample_rate == 0 {
        return 0;
    }
    let index = (frequency as f64 * fft_size.samples() as f64 / sample_rate as f64).round();
    (index as usize).min(last_bin)
}
