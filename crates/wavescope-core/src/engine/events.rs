//! Property-change notifications
//!
//! Every observable field change is one [`EngineEvent`], fanned out to every
//! subscriber. Subscribers whose receiver was dropped are pruned on the next
//! publish.

use crossbeam::channel::{self, Receiver, Sender};

use crate::types::{PlaybackState, RepeatRange, WaveformBuffer};

/// A single observable property change
#[derive(Debug, Clone)]
pub enum EngineEvent {
    PlaybackStateChanged(PlaybackState),
    CanPlayChanged(bool),
    CanPauseChanged(bool),
    CanStopChanged(bool),
    /// Position in seconds, already clamped to the track length
    ChannelPositionChanged(f64),
    /// Track length in seconds (0 when no track is loaded)
    ChannelLengthChanged(f64),
    /// New waveform buffer; `complete` marks the final buffer of a generation
    WaveformChanged {
        waveform: WaveformBuffer,
        complete: bool,
    },
    RepeatRangeChanged(Option<RepeatRange>),
    /// A background failure that did not affect playback
    InternalError(String),
}

impl EngineEvent {
    /// Name of the property this event reports
    pub fn property_name(&self) -> &'static str {
        match self {
            Self::PlaybackStateChanged(_) => "PlaybackState",
            Self::CanPlayChanged(_) => "CanPlay",
            Self::CanPauseChanged(_) => "CanPause",
            Self::CanStopChanged(_) => "CanStop",
            Self::ChannelPositionChanged(_) => "ChannelPosition",
            Self::ChannelLengthChanged(_) => "ChannelLength",
            Self::WaveformChanged { .. } => "WaveformData",
            Self::RepeatRangeChanged(_) => "RepeatRange",
            Self::InternalError(_) => "InternalError",
        }
    }
}

/// Subscriber list for [`EngineEvent`]s
#[derive(Default)]
pub struct Observers {
    subscribers: Vec<Sender<EngineEvent>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver an event to every live subscriber
    pub fn publish(&mut self, event: EngineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers (as of the last publish)
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
