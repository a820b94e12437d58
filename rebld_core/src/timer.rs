//! Countdown used for rest intervals and AMRAP windows.
//!
//! A [`Countdown`] is pure state over an injected [`Clock`]: it never
//! schedules anything itself. Something else (see [`crate::ticker`]) wakes it
//! up and calls [`Countdown::tick`]. Elapsed time is measured from monotonic
//! instants, so wall-clock adjustments cannot shift it.

use crate::clock::SharedClock;
use std::fmt;
use std::time::{Duration, Instant};

/// How a countdown ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownOutcome {
    /// Remaining time reached zero
    Completed,
    /// The user skipped the rest of it
    Skipped,
}

/// Result of waking a countdown up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Still counting (or paused) with this much left
    Remaining(Duration),
    /// Ended on this tick; reported exactly once
    Finished(CountdownOutcome),
    /// Already ended or cancelled
    Inert,
}

type FinishCallback = Box<dyn FnOnce(CountdownOutcome) + Send>;

pub struct Countdown {
    clock: SharedClock,
    target: Duration,
    /// Running time accumulated before the current running segment
    banked: Duration,
    running_since: Option<Instant>,
    finished: bool,
    on_finish: Option<FinishCallback>,
}

impl Countdown {
    /// Create a countdown that is already running
    pub fn start(clock: SharedClock, seconds: u32) -> Self {
        let now = clock.now();
        Self {
            clock,
            target: Duration::from_secs(u64::from(seconds)),
            banked: Duration::ZERO,
            running_since: Some(now),
            finished: false,
            on_finish: None,
        }
    }

    /// Create a countdown that waits for [`Countdown::resume`]
    pub fn paused(clock: SharedClock, seconds: u32) -> Self {
        Self {
            clock,
            target: Duration::from_secs(u64::from(seconds)),
            banked: Duration::ZERO,
            running_since: None,
            finished: false,
            on_finish: None,
        }
    }

    /// Register a callback fired once when the countdown completes or is skipped
    pub fn on_finish(mut self, callback: impl FnOnce(CountdownOutcome) + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(callback));
        self
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    pub fn elapsed(&self) -> Duration {
        let running = self
            .running_since
            .map(|since| self.clock.now().saturating_duration_since(since))
            .unwrap_or(Duration::ZERO);
        self.banked + running
    }

    pub fn remaining(&self) -> Duration {
        if self.finished {
            return Duration::ZERO;
        }
        self.target.saturating_sub(self.elapsed())
    }

    pub fn is_running(&self) -> bool {
        !self.finished && self.running_since.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Start or resume counting. Returns false if nothing changed.
    pub fn resume(&mut self) -> bool {
        if self.finished || self.running_since.is_some() {
            return false;
        }
        self.running_since = Some(self.clock.now());
        true
    }

    /// Stop counting, keeping elapsed progress. Returns false if nothing changed.
    pub fn pause(&mut self) -> bool {
        if self.finished {
            return false;
        }
        match self.running_since.take() {
            Some(since) => {
                self.banked += self.clock.now().saturating_duration_since(since);
                true
            }
            None => false,
        }
    }

    /// Extend the target; elapsed progress is untouched
    pub fn add_time(&mut self, seconds: u32) {
        if self.finished {
            return;
        }
        self.target += Duration::from_secs(u64::from(seconds));
        tracing::debug!("Countdown extended by {}s to {:?}", seconds, self.target);
    }

    /// Wake the countdown up and report where it stands
    pub fn tick(&mut self) -> Tick {
        if self.finished {
            return Tick::Inert;
        }
        let remaining = self.remaining();
        if remaining.is_zero() {
            self.finish(CountdownOutcome::Completed);
            return Tick::Finished(CountdownOutcome::Completed);
        }
        Tick::Remaining(remaining)
    }

    /// End immediately as skipped, even if no time is left.
    ///
    /// Returns `None` when the countdown had already ended.
    pub fn skip(&mut self) -> Option<CountdownOutcome> {
        if self.finished {
            return None;
        }
        self.finish(CountdownOutcome::Skipped);
        Some(CountdownOutcome::Skipped)
    }

    /// Stop without reporting an outcome; the callback is dropped unfired
    pub fn cancel(&mut self) {
        if !self.finished {
            tracing::debug!("Countdown cancelled with {:?} left", self.remaining());
        }
        self.finished = true;
        self.running_since = None;
        self.on_finish = None;
    }

    fn finish(&mut self, outcome: CountdownOutcome) {
        self.finished = true;
        self.running_since = None;
        if let Some(callback) = self.on_finish.take() {
            callback(outcome);
        }
    }
}

impl fmt::Debug for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Countdown")
            .field("target", &self.target)
            .field("elapsed", &self.elapsed())
            .field("running", &self.is_running())
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_add_time_keeps_elapsed_progress() {
        let clock = ManualClock::new();
        let mut countdown = Countdown::start(clock.shared(), 90);

        clock.advance(secs(30));
        assert_eq!(countdown.remaining(), secs(60));

        countdown.add_time(15);

        assert_eq!(countdown.remaining(), secs(75));
        assert_eq!(countdown.elapsed(), secs(30));
        assert_eq!(countdown.target(), secs(105));
    }

    #[test]
    fn test_completion_reported_exactly_once() {
        let clock = ManualClock::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut countdown = Countdown::start(clock.shared(), 10).on_finish(move |outcome| {
            assert_eq!(outcome, CountdownOutcome::Completed);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        clock.advance(secs(4));
        assert_eq!(countdown.tick(), Tick::Remaining(secs(6)));

        clock.advance(secs(10));
        assert_eq!(countdown.tick(), Tick::Finished(CountdownOutcome::Completed));
        assert_eq!(countdown.tick(), Tick::Inert);
        assert_eq!(countdown.tick(), Tick::Inert);

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_skip_is_distinguishable_and_works_at_zero() {
        let clock = ManualClock::new();
        let outcome = Arc::new(std::sync::Mutex::new(None));
        let seen = Arc::clone(&outcome);
        let mut countdown = Countdown::start(clock.shared(), 5)
            .on_finish(move |o| *seen.lock().unwrap() = Some(o));

        clock.advance(secs(5));
        assert_eq!(countdown.remaining(), Duration::ZERO);

        assert_eq!(countdown.skip(), Some(CountdownOutcome::Skipped));
        assert_eq!(*outcome.lock().unwrap(), Some(CountdownOutcome::Skipped));

        // Skip after the end is a no-op
        assert_eq!(countdown.skip(), None);
        assert_eq!(countdown.tick(), Tick::Inert);
    }

    #[test]
    fn test_cancel_never_fires_callback() {
        let clock = ManualClock::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let mut countdown = Countdown::start(clock.shared(), 3).on_finish(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        countdown.cancel();
        clock.advance(secs(10));

        assert_eq!(countdown.tick(), Tick::Inert);
        assert_eq!(countdown.skip(), None);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pause_and_resume() {
        let clock = ManualClock::new();
        let mut countdown = Countdown::paused(clock.shared(), 60);

        clock.advance(secs(20));
        assert_eq!(countdown.remaining(), secs(60));
        assert!(!countdown.is_running());

        assert!(countdown.resume());
        assert!(!countdown.resume());
        clock.advance(secs(15));
        assert!(countdown.pause());
        clock.advance(secs(100));

        assert_eq!(countdown.remaining(), secs(45));
        assert_eq!(countdown.tick(), Tick::Remaining(secs(45)));
    }
}
