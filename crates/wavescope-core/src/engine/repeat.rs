//! Repeat (loop) range
//!
//! Holds the current loop window and the backend registration that fires
//! when playback crosses its end. The anchor is where stop and loop restarts
//! seek to: the range start while a range is set, 0 otherwise.

use crate::backend::{
    AudioBackend, BackendResult, BoundaryCallback, BoundaryTrigger, CallbackId, StreamHandle,
};
use crate::types::RepeatRange;

#[derive(Debug, Default)]
pub struct RepeatRangeController {
    range: Option<RepeatRange>,
    registration: Option<CallbackId>,
}

impl RepeatRangeController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active range
    ///
    /// Any previous registration is removed first. If the new boundary cannot
    /// be registered the controller is left with no range.
    pub fn set(
        &mut self,
        backend: &dyn AudioBackend,
        handle: StreamHandle,
        range: RepeatRange,
        on_boundary: BoundaryCallback,
    ) -> BackendResult<()> {
        self.remove_registration(backend, handle);
        self.range = None;

        let id = backend.register_boundary_callback(
            handle,
            BoundaryTrigger::Position(range.end),
            on_boundary,
        )?;
        self.registration = Some(id);
        self.range = Some(range);
        log::debug!(
            "Repeat range {:.3}..{:.3}s on {}",
            range.start,
            range.end,
            handle
        );
        Ok(())
    }

    /// Remove the range; returns whether one was set
    pub fn clear(&mut self, backend: &dyn AudioBackend, handle: StreamHandle) -> bool {
        self.remove_registration(backend, handle);
        self.range.take().is_some()
    }

    pub fn range(&self) -> Option<RepeatRange> {
        self.range
    }

    /// Position stop and loop restarts return to
    pub fn anchor(&self) -> f64 {
        self.range.map(|r| r.start).unwrap_or(0.0)
    }

    fn remove_registration(&mut self, backend: &dyn AudioBackend, handle: StreamHandle) {
        if let Some(id) = self.registration.take() {
            backend.remove_callback(handle, id);
        }
    }
}
