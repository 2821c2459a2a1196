//! The playback engine
//!
//! Owns the active stream and all observable state. Commands run to
//! completion on the owner's thread; background activity (waveform worker,
//! position poller, backend boundary callbacks) arrives as [`EngineMessage`]s
//! and is applied by [`PlaybackEngine::process_pending`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use crate::backend::{AudioBackend, BackendError, BoundaryTrigger, CallbackId, StreamHandle};
use crate::config::EngineConfig;
use crate::spectrum::{fft_frequency_to_index, SpectrumDataSource};
use crate::types::{
    Capabilities, FullLevelBuffer, PlaybackState, PositionOrigin, RepeatRange, Track,
    WaveformBuffer, DEFAULT_SAMPLE_RATE,
};
use crate::waveform::{downsample, GeneratorSettings, WaveformGenerator, WaveformMessage};

use super::error::{EngineError, EngineResult};
use super::events::{EngineEvent, Observers};
use super::message::EngineMessage;
use super::poller::PositionPoller;
use super::repeat::RepeatRangeController;

/// The stream currently opened for playback
#[derive(Debug, Clone, Copy)]
struct ActiveStream {
    handle: StreamHandle,
    end_callback: CallbackId,
}

/// Audio playback engine driving waveform and spectrum visualizations
///
/// # Example
///
/// ```ignore
/// let mut engine = PlaybackEngine::new(backend, EngineConfig::default())?;
/// let events = engine.subscribe();
///
/// engine.open_file("/music/track.flac")?;
/// engine.play();
///
/// loop {
///     engine.process_blocking(Duration::from_millis(16));
///     for event in events.try_iter() {
///         // redraw
///     }
/// }
/// ```
pub struct PlaybackEngine {
    backend: Arc<dyn AudioBackend>,
    config: EngineConfig,

    inbox_tx: Sender<EngineMessage>,
    inbox_rx: Receiver<EngineMessage>,
    observers: Observers,

    generator: WaveformGenerator,
    poller: PositionPoller,
    repeat: RepeatRangeController,

    stream: Option<ActiveStream>,
    track: Option<Track>,
    state: PlaybackState,
    capabilities: Capabilities,
    position: f64,
    length: f64,
    waveform: WaveformBuffer,
    full_levels: Option<FullLevelBuffer>,
}

impl PlaybackEngine {
    /// Create an engine and spawn its waveform worker
    pub fn new(backend: Arc<dyn AudioBackend>, config: EngineConfig) -> std::io::Result<Self> {
        let config = config.validated();
        let (inbox_tx, inbox_rx) = channel::unbounded();

        let waveform_tx = inbox_tx.clone();
        let generator = WaveformGenerator::spawn(
            backend.clone(),
            GeneratorSettings::from(&config),
            move |msg| {
                // Receiver only goes away with the engine
                let _ = waveform_tx.send(EngineMessage::Waveform(msg));
            },
        )?;
        let poller = PositionPoller::new(config.position_poll_interval(), inbox_tx.clone());

        log::info!(
            "PlaybackEngine created ({} waveform points, {:?} poll interval)",
            config.waveform_point_count,
            config.position_poll_interval()
        );

        Ok(Self {
            backend,
            config,
            inbox_tx,
            inbox_rx,
            observers: Observers::new(),
            generator,
            poller,
            repeat: RepeatRangeController::new(),
            stream: None,
            track: None,
            state: PlaybackState::Stopped,
            capabilities: Capabilities::default(),
            position: 0.0,
            length: 0.0,
            waveform: WaveformBuffer::default(),
            full_levels: None,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────

    /// Open a file for playback, replacing the current track
    ///
    /// On success the engine is Stopped at position 0 with `CanPlay` set and
    /// waveform generation for the new path has been scheduled. On failure no
    /// track is loaded.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> EngineResult<()> {
        let path = path.as_ref();

        self.stop();
        self.set_state(PlaybackState::OpeningFile);
        self.release_stream();

        let result = self.open_stream(path);
        self.set_state(PlaybackState::Stopped);

        match &result {
            Ok(()) => log::info!("Opened {:?} ({:.2}s)", path, self.length),
            Err(e) => log::warn!("Failed to open {:?}: {}", path, e),
        }
        result
    }

    /// Start or resume playback (only when `CanPlay`)
    pub fn play(&mut self) {
        if !self.capabilities.can_play {
            return;
        }
        let Some(handle) = self.active_handle() else {
            return;
        };
        if let Err(e) = self.backend.play(handle) {
            log::error!("Backend refused to play {}: {}", handle, e);
            return;
        }
        self.set_state(PlaybackState::Playing);
    }

    /// Pause playback (only while Playing)
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing || !self.capabilities.can_pause {
            return;
        }
        let Some(handle) = self.active_handle() else {
            return;
        };
        if let Err(e) = self.backend.pause(handle) {
            log::error!("Backend refused to pause {}: {}", handle, e);
            return;
        }
        self.set_state(PlaybackState::Paused);
    }

    /// Stop playback and return to the repeat anchor (0 without a range)
    ///
    /// Valid in any state; calling it twice is the same as calling it once.
    pub fn stop(&mut self) {
        self.apply_position(self.repeat.anchor(), PositionOrigin::Transport);
        if let Some(handle) = self.active_handle() {
            if let Err(e) = self.backend.stop(handle) {
                log::warn!("Backend stop failed on {}: {}", handle, e);
            }
        }
        self.set_state(PlaybackState::Stopped);
    }

    /// Seek to `seconds`, clamped to `[0, length]`
    pub fn seek(&mut self, seconds: f64) {
        self.apply_position(seconds, PositionOrigin::UserSeek);
    }

    /// Loop playback between `start` and `end` seconds
    ///
    /// Replaces any existing range. Reaching `end` jumps back to `start`
    /// without leaving the current playback state.
    pub fn set_repeat_range(&mut self, start: f64, end: f64) -> EngineResult<()> {
        let handle = self.active_handle().ok_or(EngineError::NoTrackLoaded)?;
        let range = RepeatRange::new(start, end, self.length).ok_or(
            EngineError::InvalidRepeatRange {
                start,
                end,
                length: self.length,
            },
        )?;

        let inbox = self.inbox_tx.clone();
        let had_range = self.repeat.range().is_some();
        let result = self.repeat.set(
            self.backend.as_ref(),
            handle,
            range,
            Box::new(move || {
                let _ = inbox.send(EngineMessage::RepeatBoundary { handle });
            }),
        );

        match result {
            Ok(()) => {
                self.observers
                    .publish(EngineEvent::RepeatRangeChanged(Some(range)));
                Ok(())
            }
            Err(e) => {
                if had_range {
                    self.observers.publish(EngineEvent::RepeatRangeChanged(None));
                }
                Err(EngineError::BoundaryCallbackRegistrationFailed(e))
            }
        }
    }

    /// Remove the repeat range; stop returns to 0 afterwards
    pub fn clear_repeat_range(&mut self) {
        let Some(handle) = self.active_handle() else {
            return;
        };
        if self.repeat.clear(self.backend.as_ref(), handle) {
            self.observers.publish(EngineEvent::RepeatRangeChanged(None));
        }
    }

    /// Recompute the compressed waveform at a different resolution
    ///
    /// Uses the retained full-resolution levels; returns `None` until a
    /// generation for the current track has completed.
    pub fn resample_waveform(&self, point_count: usize) -> Option<WaveformBuffer> {
        self.full_levels
            .as_ref()
            .map(|full| downsample(&full.levels, point_count))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Inbox
    // ─────────────────────────────────────────────────────────────────────

    /// Apply every queued background message without blocking
    ///
    /// Returns the number of messages applied.
    pub fn process_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(msg) = self.inbox_rx.try_recv() {
            self.handle_message(msg);
            count += 1;
        }
        count
    }

    /// Wait up to `timeout` for a message, then apply everything queued
    pub fn process_blocking(&mut self, timeout: Duration) -> usize {
        match self.inbox_rx.recv_timeout(timeout) {
            Ok(msg) => {
                self.handle_message(msg);
                1 + self.process_pending()
            }
            Err(_) => 0,
        }
    }

    fn handle_message(&mut self, msg: EngineMessage) {
        match msg {
            EngineMessage::EndOfTrack { handle } => {
                if self.active_handle() != Some(handle) {
                    log::debug!("Ignoring end of track for stale {}", handle);
                    return;
                }
                log::debug!("End of track on {}", handle);
                self.stop();
            }
            EngineMessage::RepeatBoundary { handle } => {
                if self.active_handle() != Some(handle) || self.repeat.range().is_none() {
                    log::debug!("Ignoring repeat boundary for {}", handle);
                    return;
                }
                self.apply_position(self.repeat.anchor(), PositionOrigin::LoopRestart);
            }
            EngineMessage::PositionTick => self.refresh_position(),
            EngineMessage::Waveform(msg) => self.handle_waveform(msg),
        }
    }

    fn handle_waveform(&mut self, msg: WaveformMessage) {
        if msg.generation() != self.generator.latest_generation() {
            log::debug!("Dropping waveform message from generation #{}", msg.generation());
            return;
        }

        match msg {
            WaveformMessage::Partial { waveform, .. } => {
                self.publish_waveform(waveform, false);
            }
            WaveformMessage::Complete {
                waveform,
                full_levels,
                ..
            } => {
                self.full_levels = Some(full_levels);
                self.publish_waveform(waveform, true);
            }
            WaveformMessage::Cancelled { generation, path } => {
                log::debug!("Waveform generation #{} for {:?} cancelled", generation, path);
            }
            WaveformMessage::Failed {
                generation,
                path,
                error,
            } => {
                log::error!(
                    "Waveform generation #{} failed for {:?}: {}",
                    generation,
                    path,
                    error
                );
                self.observers.publish(EngineEvent::InternalError(format!(
                    "Waveform generation failed for {}: {}",
                    path.display(),
                    error
                )));
            }
        }
    }

    fn refresh_position(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        let Some(handle) = self.active_handle() else {
            self.apply_position(0.0, PositionOrigin::PollerRefresh);
            return;
        };
        match self.backend.position(handle) {
            Ok(seconds) => self.apply_position(seconds, PositionOrigin::PollerRefresh),
            Err(e) => log::warn!("Position query failed on {}: {}", handle, e),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────────────

    /// Receive every property change from now on
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        self.observers.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn can_play(&self) -> bool {
        self.capabilities.can_play
    }

    pub fn can_pause(&self) -> bool {
        self.capabilities.can_pause
    }

    pub fn can_stop(&self) -> bool {
        self.capabilities.can_stop
    }

    pub fn is_opening_file(&self) -> bool {
        self.state == PlaybackState::OpeningFile
    }

    /// Current position in seconds
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Track length in seconds (0 without a track)
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    /// Latest published waveform (empty until the first publication)
    pub fn waveform(&self) -> &WaveformBuffer {
        &self.waveform
    }

    /// Full-resolution levels of the last completed generation
    pub fn full_levels(&self) -> Option<&FullLevelBuffer> {
        self.full_levels.as_ref()
    }

    pub fn repeat_range(&self) -> Option<RepeatRange> {
        self.repeat.range()
    }

    /// Backend handle of the playback stream, if a track is loaded
    pub fn stream_handle(&self) -> Option<StreamHandle> {
        self.active_handle()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn active_handle(&self) -> Option<StreamHandle> {
        self.stream.map(|s| s.handle)
    }

    /// Open `path` and make it the active stream
    fn open_stream(&mut self, path: &Path) -> EngineResult<()> {
        if !path.is_file() {
            return Err(EngineError::FileNotFound(path.to_path_buf()));
        }

        let handle = self.backend.open_stream(path).map_err(|e| match e {
            BackendError::FileNotFound(p) => EngineError::FileNotFound(p),
            source => EngineError::BackendStreamCreationFailed {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let info = self
            .backend
            .length(handle)
            .and_then(|length| {
                if !length.is_finite() || length < 0.0 {
                    return Err(BackendError::InvalidLength(length));
                }
                Ok((length, self.backend.sample_rate(handle)?))
            });
        let (length, sample_rate) = match info {
            Ok(info) => info,
            Err(source) => {
                self.backend.free(handle);
                return Err(EngineError::BackendStreamCreationFailed {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let inbox = self.inbox_tx.clone();
        let end_callback = match self.backend.register_boundary_callback(
            handle,
            BoundaryTrigger::End,
            Box::new(move || {
                let _ = inbox.send(EngineMessage::EndOfTrack { handle });
            }),
        ) {
            Ok(id) => id,
            Err(e) => {
                self.backend.free(handle);
                return Err(EngineError::BoundaryCallbackRegistrationFailed(e));
            }
        };

        self.stream = Some(ActiveStream {
            handle,
            end_callback,
        });
        self.track = Some(Track {
            path: path.to_path_buf(),
            length,
            sample_rate,
        });
        self.set_length(length);

        if self.config.waveform_point_count > 0 {
            self.generator
                .generate(path.to_path_buf(), self.config.waveform_point_count);
        }
        Ok(())
    }

    /// Tear down the active stream and everything derived from it
    fn release_stream(&mut self) {
        // In-flight results for the old track must never be applied
        self.generator.cancel();

        if let Some(stream) = self.stream.take() {
            if self.repeat.clear(self.backend.as_ref(), stream.handle) {
                self.observers.publish(EngineEvent::RepeatRangeChanged(None));
            }
            self.backend.remove_callback(stream.handle, stream.end_callback);
            self.backend.free(stream.handle);
            log::debug!("Released {}", stream.handle);
        }

        self.track = None;
        self.full_levels = None;
        self.set_length(0.0);
        self.apply_position(0.0, PositionOrigin::Transport);
        if !self.waveform.is_empty() {
            self.publish_waveform(WaveformBuffer::default(), false);
        }
    }

    /// Clamp and store a position, seeking the backend unless the write
    /// reports where the backend already is
    fn apply_position(&mut self, seconds: f64, origin: PositionOrigin) {
        if seconds.is_nan() {
            log::warn!("Ignoring NaN position ({:?})", origin);
            return;
        }
        let clamped = seconds.clamp(0.0, self.length);

        if origin.issues_seek() {
            if let Some(handle) = self.active_handle() {
                if let Err(e) = self.backend.seek(handle, clamped) {
                    log::warn!("Seek to {:.3}s failed on {}: {}", clamped, handle, e);
                }
            }
        }

        if clamped != self.position {
            self.position = clamped;
            self.observers
                .publish(EngineEvent::ChannelPositionChanged(clamped));
        }
    }

    fn set_length(&mut self, length: f64) {
        if length != self.length {
            self.length = length;
            self.observers.publish(EngineEvent::ChannelLengthChanged(length));
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if state != self.state {
            log::debug!("Playback state: {} -> {}", self.state, state);
            self.state = state;
            self.observers.publish(EngineEvent::PlaybackStateChanged(state));
        }

        if state == PlaybackState::Playing {
            if let Err(e) = self.poller.start() {
                log::error!("Failed to start position poller: {}", e);
            }
        } else {
            self.poller.stop();
        }

        self.refresh_capabilities();
    }

    fn refresh_capabilities(&mut self) {
        let next = Capabilities::derive(self.state, self.track.is_some());
        let prev = std::mem::replace(&mut self.capabilities, next);

        if next.can_play != prev.can_play {
            self.observers.publish(EngineEvent::CanPlayChanged(next.can_play));
        }
        if next.can_pause != prev.can_pause {
            self.observers.publish(EngineEvent::CanPauseChanged(next.can_pause));
        }
        if next.can_stop != prev.can_stop {
            self.observers.publish(EngineEvent::CanStopChanged(next.can_stop));
        }
    }

    fn publish_waveform(&mut self, waveform: WaveformBuffer, complete: bool) {
        self.waveform = waveform.clone();
        self.observers
            .publish(EngineEvent::WaveformChanged { waveform, complete });
    }
}

impl SpectrumDataSource for PlaybackEngine {
    fn fft_data(&self, buffer: &mut [f32]) -> bool {
        match self.active_handle() {
            Some(handle) => self.backend.fft_data(handle, self.config.fft_size, buffer),
            None => false,
        }
    }

    fn fft_frequency_index(&self, frequency: u32) -> usize {
        let sample_rate = self
            .track
            .as_ref()
            .map(|t| t.sample_rate)
            .unwrap_or(DEFAULT_SAMPLE_RATE);
        fft_frequency_to_index(frequency, self.config.fft_size, sample_rate)
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.poller.stop();
        self.generator.cancel();

        if let Some(stream) = self.stream.take() {
            let backend = self.backend.as_ref();
            self.repeat.clear(backend, stream.handle);
            backend.remove_callback(stream.handle, stream.end_callback);
            if let Err(e) = backend.stop(stream.handle) {
                log::debug!("Stop on shutdown failed: {}", e);
            }
            backend.free(stream.handle);
        }
        log::info!("PlaybackEngine shut down");
    }
}
