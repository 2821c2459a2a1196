//! Background waveform generation
//!
//! Decodes an entire file on a dedicated worker thread and max-pools its
//! per-frame peak levels into a fixed number of points, so neither playback
//! nor the UI ever waits on a full decode.
//!
//! ## Design
//!
//! 1. Owner calls [`WaveformGenerator::generate`]; it returns immediately
//! 2. Every request gets a new generation id and becomes the "latest"
//! 3. The in-flight run checks the latest id once per frame and exits as
//!    soon as it has been superseded (cooperative cancel)
//! 4. Before starting a run the worker drains its queue, keeping only the
//!    newest request (single-slot, latest wins)
//! 5. Runs report through the publish callback: throttled partial buffers,
//!    then either a final buffer, a cancellation or a failure
//!
//! A stuck backend decode call blocks the worker (and shutdown) until it
//! returns; there is no hard timeout.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam::channel::{self, Receiver, Sender};
use thiserror::Error;

use crate::backend::{AudioBackend, BackendError, DecodeStream};
use crate::types::{FullLevelBuffer, WaveformBuffer};

use super::downsample::Downsampler;

/// Upper bound on the up-front level buffer reservation (about 1h of 20ms frames)
const MAX_PREALLOCATED_FRAMES: usize = 180_000;

/// A pending or in-flight waveform computation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub generation: u64,
    pub path: PathBuf,
    pub point_count: usize,
}

/// Decode failure local to one generation run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Failed to open decode stream: {0}")]
    Open(#[source] BackendError),

    #[error("Failed to query decoded length: {0}")]
    Length(#[source] BackendError),

    #[error("Decoded length {0} is not a valid duration")]
    InvalidLength(f64),

    #[error("Failed to read levels at frame {frame}: {source}")]
    Levels {
        frame: usize,
        #[source]
        source: BackendError,
    },
}

/// Output of a generation run, tagged with its generation id
#[derive(Debug, Clone)]
pub enum WaveformMessage {
    /// Progressive refinement; windows not yet reached are zero
    Partial {
        generation: u64,
        waveform: WaveformBuffer,
    },
    /// Final buffer plus the full-resolution levels it was pooled from
    Complete {
        generation: u64,
        waveform: WaveformBuffer,
        full_levels: FullLevelBuffer,
    },
    /// Superseded by a newer request; nothing more will be sent for it
    Cancelled { generation: u64, path: PathBuf },
    /// The file could not be decoded
    Failed {
        generation: u64,
        path: PathBuf,
        error: GenerationError,
    },
}

impl WaveformMessage {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Partial { generation, .. }
            | Self::Complete { generation, .. }
            | Self::Cancelled { generation, .. }
            | Self::Failed { generation, .. } => *generation,
        }
    }
}

/// Per-run tunables
#[derive(Debug, Clone, Copy)]
pub struct GeneratorSettings {
    /// Seconds of audio per full-resolution frame
    pub frame_seconds: f64,
    /// Publish a partial buffer every N frames
    pub partial_publish_frames: usize,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            frame_seconds: 0.02,
            partial_publish_frames: 1500,
        }
    }
}

impl From<&crate::config::EngineConfig> for GeneratorSettings {
    fn from(config: &crate::config::EngineConfig) -> Self {
        Self {
            frame_seconds: config.frame_seconds,
            partial_publish_frames: config.partial_publish_frames.max(1),
        }
    }
}

/// State shared between the owner and the worker
struct Shared {
    latest: AtomicU64,
    shutdown: AtomicBool,
}

impl Shared {
    fn superseded(&self, generation: u64) -> bool {
        self.shutdown.load(Ordering::Acquire) || self.latest.load(Ordering::Acquire) != generation
    }
}

enum RunOutcome {
    Completed,
    Cancelled,
}

/// Handle to the waveform worker thread
///
/// Dropping the handle cancels any in-flight run and joins the worker.
pub struct WaveformGenerator {
    tx: Option<Sender<GenerationRequest>>,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl WaveformGenerator {
    /// Spawn the worker thread
    ///
    /// `publish` is called on the worker thread for every [`WaveformMessage`];
    /// it should only hand the message over to the owning context.
    pub fn spawn<F>(
        backend: Arc<dyn AudioBackend>,
        settings: GeneratorSettings,
        publish: F,
    ) -> std::io::Result<Self>
    where
        F: Fn(WaveformMessage) + Send + 'static,
    {
        let (tx, rx) = channel::unbounded::<GenerationRequest>();
        let shared = Arc::new(Shared {
            latest: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        });
        let worker_shared = shared.clone();

        let handle = thread::Builder::new()
            .name("waveform-generator".to_string())
            .spawn(move || {
                worker_loop(rx, worker_shared, backend.as_ref(), settings, publish);
            })?;

        log::info!(
            "WaveformGenerator started ({}s frames, partial every {} frames)",
            settings.frame_seconds,
            settings.partial_publish_frames
        );

        Ok(Self {
            tx: Some(tx),
            shared,
            handle: Some(handle),
        })
    }

    /// Schedule a generation for `path` (non-blocking)
    ///
    /// Supersedes whatever is in flight or pending. Returns the generation id
    /// that results for this request will carry.
    pub fn generate(&self, path: PathBuf, point_count: usize) -> u64 {
        let generation = self.shared.latest.fetch_add(1, Ordering::AcqRel) + 1;
        let request = GenerationRequest {
            generation,
            path,
            point_count,
        };
        log::debug!("Waveform request #{} for {:?}", generation, request.path);

        if let Some(tx) = &self.tx {
            if let Err(e) = tx.send(request) {
                log::error!("Waveform worker disconnected: {}", e);
            }
        }
        generation
    }

    /// Cancel whatever is in flight or pending without scheduling new work
    pub fn cancel(&self) {
        let generation = self.shared.latest.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!("Waveform generation cancelled (now #{})", generation);
    }

    /// Id of the most recent request (or cancellation)
    pub fn latest_generation(&self) -> u64 {
        self.shared.latest.load(Ordering::Acquire)
    }

    /// Check if the worker thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for WaveformGenerator {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        // Disconnecting the queue wakes an idle worker
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Waveform worker panicked");
            }
        }
    }
}

fn worker_loop<F>(
    rx: Receiver<GenerationRequest>,
    shared: Arc<Shared>,
    backend: &dyn AudioBackend,
    settings: GeneratorSettings,
    publish: F,
) where
    F: Fn(WaveformMessage),
{
    log::debug!("Waveform worker starting");

    while let Ok(mut request) = rx.recv() {
        // Coalesce: only the newest pending request survives
        while let Ok(newer) = rx.try_recv() {
            request = newer;
        }

        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        if shared.superseded(request.generation) {
            log::debug!("Skipping superseded waveform request #{}", request.generation);
            continue;
        }

        let started = Instant::now();
        match run(backend, &request, settings, &shared, &publish) {
            Ok(RunOutcome::Completed) => {
                log::debug!(
                    "Waveform #{} for {:?} generated in {:?}",
                    request.generation,
                    request.path,
                    started.elapsed()
                );
            }
            Ok(RunOutcome::Cancelled) => {
                log::debug!("Waveform #{} cancelled", request.generation);
                publish(WaveformMessage::Cancelled {
                    generation: request.generation,
                    path: request.path,
                });
            }
            Err(error) => {
                log::error!("Waveform generation for {:?} failed: {}", request.path, error);
                publish(WaveformMessage::Failed {
                    generation: request.generation,
                    path: request.path,
                    error,
                });
            }
        }
    }

    log::debug!("Waveform worker shutting down");
}

/// One generation pass over a decode-only stream
fn run<F>(
    backend: &dyn AudioBackend,
    request: &GenerationRequest,
    settings: GeneratorSettings,
    shared: &Shared,
    publish: &F,
) -> Result<RunOutcome, GenerationError>
where
    F: Fn(WaveformMessage),
{
    let stream = DecodeStream::open(backend, &request.path).map_err(GenerationError::Open)?;
    let length = stream.length().map_err(GenerationError::Length)?;
    if !length.is_finite() || length < 0.0 {
        return Err(GenerationError::InvalidLength(length));
    }

    // Epsilon keeps exact multiples (10.0 / 0.02) from flooring one frame short
    let frame_count = (length / settings.frame_seconds + 1e-9) as usize;
    let mut full_levels = Vec::with_capacity(frame_count.min(MAX_PREALLOCATED_FRAMES));
    let mut downsampler = Downsampler::new(frame_count, request.point_count);

    for frame in 0..frame_count {
        if shared.superseded(request.generation) {
            return Ok(RunOutcome::Cancelled);
        }

        let level = stream
            .next_levels(settings.frame_seconds)
            .map_err(|source| GenerationError::Levels { frame, source })?;
        full_levels.push(level);
        downsampler.push(level);

        if frame % settings.partial_publish_frames == 0 {
            publish(WaveformMessage::Partial {
                generation: request.generation,
                waveform: downsampler.snapshot(),
            });
        }
    }

    drop(stream);
    if shared.superseded(request.generation) {
        return Ok(RunOutcome::Cancelled);
    }

    publish(WaveformMessage::Complete {
        generation: request.generation,
        waveform: downsampler.finish(),
        full_levels: FullLevelBuffer {
            path: request.path.clone(),
            frame_seconds: settings.frame_seconds,
            levels: full_levels.into(),
        },
    });
    Ok(RunOutcome::Completed)
}
