//! Playback engine - state machine, position tracking and repeat ranges
//!
//! - [`PlaybackEngine`]: owns the active stream and every piece of engine state
//! - [`PositionPoller`]: periodic position refresh while playing
//! - [`RepeatRangeController`]: loop window backed by a boundary callback
//! - [`EngineEvent`] / [`Observers`]: property-change notifications
//! - [`EngineMessage`]: the owning context's inbox
//!
//! # Threading
//!
//! ```text
//! ┌──────────────┐  commands   ┌────────────────┐  EngineEvent  ┌───────────────┐
//! │  UI / owner  │ ──────────► │ PlaybackEngine │ ────────────► │ visualizations│
//! └──────────────┘             └────────────────┘               └───────────────┘
//!                                      ▲ inbox (EngineMessage)
//!          ┌───────────────────────────┼──────────────────────────┐
//!   ┌──────────────┐          ┌────────────────┐          ┌──────────────────┐
//!   │ waveform     │          │ position       │          │ backend boundary │
//!   │ worker       │          │ poller         │          │ callbacks        │
//!   └──────────────┘          └────────────────┘          └──────────────────┘
//! ```
//!
//! Nothing outside the owner mutates engine state; everything else sends a
//! message that is applied when the owner calls
//! [`PlaybackEngine::process_pending`].

mod error;
mod events;
mod message;
mod playback;
mod poller;
mod repeat;

pub use error::{EngineError, EngineResult};
pub use events::{EngineEvent, Observers};
pub use message::EngineMessage;
pub use playback::PlaybackEngine;
pub use poller::PositionPoller;
pub use repeat::RepeatRangeController;
