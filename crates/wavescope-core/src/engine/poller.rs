//! Periodic position refresh
//!
//! A small thread that sends [`EngineMessage::PositionTick`] into the engine
//! inbox at a fixed interval. The engine starts it when entering `Playing`
//! and stops it on any other state, so it never runs while idle.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};

use super::message::EngineMessage;

struct Running {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Timer thread driving position refreshes while playing
pub struct PositionPoller {
    interval: Duration,
    inbox: Sender<EngineMessage>,
    running: Option<Running>,
}

impl PositionPoller {
    pub fn new(interval: Duration, inbox: Sender<EngineMessage>) -> Self {
        Self {
            interval,
            inbox,
            running: None,
        }
    }

    /// Start ticking (no-op if already running)
    pub fn start(&mut self) -> std::io::Result<()> {
        if self.running.is_some() {
            return Ok(());
        }

        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let inbox = self.inbox.clone();
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name("position-poller".to_string())
            .spawn(move || {
                let ticker = channel::tick(interval);
                loop {
                    crossbeam::select! {
                        recv(ticker) -> _ => {
                            if inbox.send(EngineMessage::PositionTick).is_err() {
                                // Engine gone
                                break;
                            }
                        }
                        // Stop sender dropped
                        recv(stop_rx) -> _ => break,
                    }
                }
            })?;

        log::debug!("Position poller started ({:?})", self.interval);
        self.running = Some(Running { stop_tx, handle });
        Ok(())
    }

    /// Stop ticking and join the thread (no-op if not running)
    pub fn stop(&mut self) {
        if let Some(Running { stop_tx, handle }) = self.running.take() {
            drop(stop_tx);
            if handle.join().is_err() {
                log::error!("Position poller panicked");
            }
            log::debug!("Position poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for PositionPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_while_running() {
        let (tx, rx) = channel::unbounded();
        let mut poller = PositionPoller::new(Duration::from_millis(5), tx);

        poller.start().unwrap();
        assert!(poller.is_running());
        for _ in 0..3 {
            let msg = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert!(matches!(msg, EngineMessage::PositionTick));
        }

        poller.stop();
        assert!(!poller.is_running());

        // Nothing new arrives once stopped
        while rx.try_recv().is_ok() {}
        std::thread::sleep(Duration::from_millis(30));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_start_and_stop_idempotent() {
        let (tx, _rx) = channel::unbounded();
        let mut poller = PositionPoller::new(Duration::from_millis(50), tx);

        poller.stop();
        poller.start().unwrap();
        poller.start().unwrap();
        assert!(poller.is_running());
        poller.stop();
        poller.stop();
        assert!(!poller.is_running());
    }

    #[test]
    fn test_exits_when_inbox_dropped() {
        let (tx, rx) = channel::unbounded();
        let mut poller = PositionPoller::new(Duration::from_millis(5), tx);
        poller.start().unwrap();
        drop(rx);

        // Thread ends on its own; stop only joins it
        poller.stop();
        assert!(!poller.is_running());
    }
}
