//! Scriptable in-memory backend for tests
//!
//! Files are registered by path with a length, sample rate and a level
//! function of time. Decode streams walk that function frame by frame;
//! playback streams only move when a test seeks or calls `set_position`.
//! Registered boundary callbacks are fired explicitly with `fire_end` and
//! `fire_position`, from whatever thread the test chooses.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::backend::{
    AudioBackend, BackendError, BackendResult, BoundaryCallback, BoundaryTrigger, CallbackId,
    StreamHandle,
};
use crate::types::{FftSize, StereoLevel};

type LevelFn = Arc<dyn Fn(f64) -> StereoLevel + Send + Sync>;

/// A file the mock backend knows how to open
#[derive(Clone)]
pub struct MockFile {
    pub length: f64,
    pub sample_rate: u32,
    level: LevelFn,
    fail_open: bool,
    fail_decode: bool,
}

impl MockFile {
    /// Same level on both channels for the whole file
    pub fn constant(length: f64, level: f32) -> Self {
        Self::with_levels(length, move |_| StereoLevel::new(level, level))
    }

    /// Levels as a function of time in seconds
    pub fn with_levels(
        length: f64,
        level: impl Fn(f64) -> StereoLevel + Send + Sync + 'static,
    ) -> Self {
        Self {
            length,
            sample_rate: 44100,
            level: Arc::new(level),
            fail_open: false,
            fail_decode: false,
        }
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Playback stream creation fails
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Decode-only stream creation fails
    pub fn failing_decode(mut self) -> Self {
        self.fail_decode = true;
        self
    }
}

/// A transport call recorded by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Seek(StreamHandle, f64),
    Play(StreamHandle),
    Pause(StreamHandle),
    Stop(StreamHandle),
    Free(StreamHandle),
}

struct MockStream {
    path: PathBuf,
    file: MockFile,
    position: f64,
    decode: bool,
}

struct RegisteredCallback {
    handle: StreamHandle,
    trigger: BoundaryTrigger,
    callback: Arc<dyn Fn() + Send + Sync>,
}

#[derive(Default)]
struct MockInner {
    files: HashMap<PathBuf, MockFile>,
    streams: HashMap<u64, MockStream>,
    callbacks: HashMap<u64, RegisteredCallback>,
    next_id: u64,
    calls: Vec<MockCall>,
    decode_history: Vec<PathBuf>,
    fail_register: bool,
    level_delay: Duration,
    fft_available: bool,
}

/// In-memory `AudioBackend`
#[derive(Default)]
pub struct MockBackend {
    inner: Mutex<MockInner>,
}

impl MockBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.lock().fft_available = true;
        backend
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, file: MockFile) {
        self.lock().files.insert(path.into(), file);
    }

    /// Make every boundary registration fail
    pub fn fail_callback_registration(&self, fail: bool) {
        self.lock().fail_register = fail;
    }

    /// Sleep this long inside every level read (keeps a generation in flight)
    pub fn set_level_delay(&self, delay: Duration) {
        self.lock().level_delay = delay;
    }

    pub fn set_fft_available(&self, available: bool) {
        self.lock().fft_available = available;
    }

    /// Move a playback stream as if audio had played up to `seconds`
    pub fn set_position(&self, handle: StreamHandle, seconds: f64) {
        if let Some(stream) = self.lock().streams.get_mut(&handle.0) {
            stream.position = seconds;
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::Seek(_, s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Number of streams currently open (playback and decode)
    pub fn open_stream_count(&self) -> usize {
        self.lock().streams.len()
    }

    /// Paths of every decode stream ever opened, in order
    pub fn decode_history(&self) -> Vec<PathBuf> {
        self.lock().decode_history.clone()
    }

    pub fn callback_count(&self) -> usize {
        self.lock().callbacks.len()
    }

    /// Registered position triggers for a stream
    pub fn position_triggers(&self, handle: StreamHandle) -> Vec<f64> {
        self.lock()
            .callbacks
            .values()
            .filter(|c| c.handle == handle)
            .filter_map(|c| match c.trigger {
                BoundaryTrigger::Position(p) => Some(p),
                BoundaryTrigger::End => None,
            })
            .collect()
    }

    /// Fire every end-of-stream callback of `handle`
    pub fn fire_end(&self, handle: StreamHandle) {
        self.fire(handle, |t| matches!(t, BoundaryTrigger::End));
    }

    /// Move to `seconds` and fire every position callback at or before it
    pub fn fire_position(&self, handle: StreamHandle, seconds: f64) {
        self.set_position(handle, seconds);
        self.fire(handle, |t| matches!(t, BoundaryTrigger::Position(p) if p <= seconds));
    }

    fn fire(&self, handle: StreamHandle, predicate: impl Fn(BoundaryTrigger) -> bool) {
        // Collect first so callbacks run without the lock held
        let callbacks: Vec<_> = self
            .lock()
            .callbacks
            .values()
            .filter(|c| c.handle == handle && predicate(c.trigger))
            .map(|c| c.callback.clone())
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    fn open(&self, path: &Path, decode: bool) -> BackendResult<StreamHandle> {
        let mut inner = self.lock();
        let file = inner
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::FileNotFound(path.to_path_buf()))?;

        if (decode && file.fail_decode) || (!decode && file.fail_open) {
            return Err(BackendError::StreamCreation {
                path: path.to_path_buf(),
                reason: "unsupported format".to_string(),
            });
        }

        inner.next_id += 1;
        let id = inner.next_id;
        if decode {
            inner.decode_history.push(path.to_path_buf());
        }
        inner.streams.insert(
            id,
            MockStream {
                path: path.to_path_buf(),
                file,
                position: 0.0,
                decode,
            },
        );
        Ok(StreamHandle(id))
    }

    fn with_stream<T>(
        &self,
        handle: StreamHandle,
        f: impl FnOnce(&mut MockStream) -> T,
    ) -> BackendResult<T> {
        self.lock()
            .streams
            .get_mut(&handle.0)
            .map(f)
            .ok_or(BackendError::InvalidHandle(handle))
    }

    fn record(&self, handle: StreamHandle, call: MockCall) -> BackendResult<()> {
        let mut inner = self.lock();
        if !inner.streams.contains_key(&handle.0) {
            return Err(BackendError::InvalidHandle(handle));
        }
        inner.calls.push(call);
        Ok(())
    }
}

impl AudioBackend for MockBackend {
    fn open_stream(&self, path: &Path) -> BackendResult<StreamHandle> {
        self.open(path, false)
    }

    fn create_decode_stream(&self, path: &Path) -> BackendResult<StreamHandle> {
        self.open(path, true)
    }

    fn length(&self, handle: StreamHandle) -> BackendResult<f64> {
        self.with_stream(handle, |s| s.file.length)
    }

    fn position(&self, handle: StreamHandle) -> BackendResult<f64> {
        self.with_stream(handle, |s| s.position)
    }

    fn sample_rate(&self, handle: StreamHandle) -> BackendResult<u32> {
        self.with_stream(handle, |s| s.file.sample_rate)
    }

    fn seek(&self, handle: StreamHandle, seconds: f64) -> BackendResult<()> {
        self.with_stream(handle, |s| s.position = seconds)?;
        self.record(handle, MockCall::Seek(handle, seconds))
    }

    fn play(&self, handle: StreamHandle) -> BackendResult<()> {
        self.record(handle, MockCall::Play(handle))
    }

    fn pause(&self, handle: StreamHandle) -> BackendResult<()> {
        self.record(handle, MockCall::Pause(handle))
    }

    fn stop(&self, handle: StreamHandle) -> BackendResult<()> {
        self.record(handle, MockCall::Stop(handle))
    }

    fn free(&self, handle: StreamHandle) {
        let mut inner = self.lock();
        if inner.streams.remove(&handle.0).is_some() {
            inner.callbacks.retain(|_, c| c.handle != handle);
            inner.calls.push(MockCall::Free(handle));
        }
    }

    fn levels(&self, handle: StreamHandle, window_seconds: f64) -> BackendResult<StereoLevel> {
        let delay = self.lock().level_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.with_stream(handle, |s| {
            let level = (s.file.level)(s.position);
            if s.decode {
                s.position += window_seconds;
            }
            level
        })
    }

    fn fft_data(&self, handle: StreamHandle, fft_size: FftSize, buffer: &mut [f32]) -> bool {
        let inner = self.lock();
        if !inner.fft_available || !inner.streams.contains_key(&handle.0) {
            return false;
        }
        for (i, bin) in buffer.iter_mut().take(fft_size.bins()).enumerate() {
            *bin = 1.0 / (i as f32 + 1.0);
        }
        true
    }

    fn register_boundary_callback(
        &self,
        handle: StreamHandle,
        trigger: BoundaryTrigger,
        callback: BoundaryCallback,
    ) -> BackendResult<CallbackId> {
        let mut inner = self.lock();
        if inner.fail_register {
            return Err(BackendError::CallbackRegistration(
                "sync table full".to_string(),
            ));
        }
        if !inner.streams.contains_key(&handle.0) {
            return Err(BackendError::InvalidHandle(handle));
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.callbacks.insert(
            id,
            RegisteredCallback {
                handle,
                trigger,
                callback: Arc::from(callback),
            },
        );
        Ok(CallbackId(id))
    }

    fn remove_callback(&self, _handle: StreamHandle, id: CallbackId) {
        self.lock().callbacks.remove(&id.0);
    }
}

impl MockBackend {
    /// Path a live stream was opened from
    pub fn stream_path(&self, handle: StreamHandle) -> Option<PathBuf> {
        self.lock().streams.get(&handle.0).map(|s| s.path.clone())
    }
}
