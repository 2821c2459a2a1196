//! Messages delivered to the owning context

use crate::backend::StreamHandle;
use crate::waveform::WaveformMessage;

/// Everything that can change engine state from outside a command call
///
/// Sent from the waveform worker, the position poller and backend callback
/// threads; applied in order by the owner.
#[derive(Debug, Clone)]
pub enum EngineMessage {
    /// The end-of-track boundary of `handle` was reached
    EndOfTrack { handle: StreamHandle },
    /// The repeat boundary of `handle` was reached
    RepeatBoundary { handle: StreamHandle },
    /// Poller tick; refresh the position from the backend
    PositionTick,
    /// Output of the waveform worker
    Waveform(WaveformMessage),
}
