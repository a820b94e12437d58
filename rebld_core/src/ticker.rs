//! Frame-driven scheduling for countdown displays.
//!
//! A [`FrameTicker`] wakes up at a fixed frame interval, reads the monotonic
//! clock and hands the instant to a frame callback until the callback breaks
//! or the ticker is cancelled. Cancellation is observable through a
//! [`CancelHandle`] and happens on drop as well, so no wake-ups outlive the
//! owner.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Roughly 60 wake-ups per second
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Shared cancellation flag for a ticker
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

#[derive(Debug)]
pub struct FrameTicker {
    period: Duration,
    cancel: CancelHandle,
}

impl FrameTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            // tokio intervals reject a zero period
            period: period.max(Duration::from_millis(1)),
            cancel: CancelHandle::new(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Drive `on_frame` once per frame.
    ///
    /// Returns `Some` with the break value, or `None` if the ticker was
    /// cancelled first. Frames missed while the task was starved are
    /// dropped rather than replayed.
    pub async fn run<T, F>(&self, mut on_frame: F) -> Option<T>
    where
        F: FnMut(Instant) -> ControlFlow<T>,
    {
        let mut cancelled = self.cancel.subscribe();
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *cancelled.borrow_and_update() {
                tracing::debug!("Frame ticker cancelled");
                return None;
            }

            tokio::select! {
                biased;
                changed = cancelled.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
                at = interval.tick() => {
                    if let ControlFlow::Break(value) = on_frame(at.into_std()) {
                        return Some(value);
                    }
                }
            }
        }
    }
}

impl Default for FrameTicker {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

impl Drop for FrameTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
