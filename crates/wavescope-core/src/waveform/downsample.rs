//! Max-pool downsampling of per-frame peak levels
//!
//! A track of `frame_count` frames is split into `point_count` contiguous
//! windows. Window `i` covers frames `boundaries[i]..boundaries[i + 1]` where
//!
//! ```text
//! boundaries[i] = round(frame_count * i / point_count),  i = 0..=point_count
//! ```
//!
//! Boundaries are non-decreasing, start at 0 and end at `frame_count`, so the
//! windows partition the frames exactly. When there are fewer frames than
//! points some windows are empty and stay at zero. The output always has
//! `point_count` pairs regardless of track length.

use crate::types::{StereoLevel, WaveformBuffer};

/// Window boundaries for `point_count` windows over `frame_count` frames
///
/// Returns `point_count + 1` indices.
pub fn boundary_indices(frame_count: usize, point_count: usize) -> Vec<usize> {
    if point_count == 0 {
        return vec![0];
    }
    (0..=point_count)
        .map(|i| ((frame_count as f64) * (i as f64) / (point_count as f64)).round() as usize)
        .collect()
}

/// Streaming max-pool over frames arriving one at a time
///
/// Feed frames in order with [`push`](Self::push); completed windows are
/// written into a fixed-size point buffer that can be snapshotted at any time
/// for progressive display.
#[derive(Debug)]
pub struct Downsampler {
    boundaries: Vec<usize>,
    points: Vec<StereoLevel>,
    next_point: usize,
    frame: usize,
    running_max: StereoLevel,
}

impl Downsampler {
    pub fn new(frame_count: usize, point_count: usize) -> Self {
        Self {
            boundaries: boundary_indices(frame_count, point_count),
            points: vec![StereoLevel::default(); point_count],
            next_point: 0,
            frame: 0,
            running_max: StereoLevel::default(),
        }
    }

    /// Add the next frame's peak pair
    pub fn push(&mut self, level: StereoLevel) {
        // Windows ending at this frame's index are complete before it counts
        self.close_windows_through(self.frame);
        self.running_max = self.running_max.max(level);
        self.frame += 1;
    }

    /// Windows emitted so far
    pub fn completed_points(&self) -> usize {
        self.next_point
    }

    /// Copy of the point buffer with every window completed so far
    pub fn snapshot(&self) -> WaveformBuffer {
        WaveformBuffer::new(self.points.clone())
    }

    /// Close all remaining windows and return the final buffer
    pub fn finish(mut self) -> WaveformBuffer {
        while self.next_point < self.points.len() {
            self.emit();
        }
        WaveformBuffer::new(self.points)
    }

    fn close_windows_through(&mut self, frame: usize) {
        while self.next_point < self.points.len() && self.boundaries[self.next_point + 1] <= frame {
            self.emit();
        }
    }

    fn emit(&mut self) {
        self.points[self.next_point] = self.running_max;
        self.running_max = StereoLevel::default();
        self.next_point += 1;
    }
}

/// Downsample an already complete level sequence
pub fn downsample(levels: &[StereoLevel], point_count: usize) -> WaveformBuffer {
    let mut downsampler = Downsampler::new(levels.len(), point_count);
    for &level in levels {
        downsampler.push(level);
    }
    downsampler.finish()
}
