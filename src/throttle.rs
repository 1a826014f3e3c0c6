//! Sequential, rate-limited dispatch of routing calls.
//!
//! The routing backend rate-limits aggressively, so calls are issued one
//! at a time with a minimum spacing. Waits are sliced so that a
//! cancellation or an expired deadline is noticed promptly.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Default spacing between routing calls.
pub const DEFAULT_CALL_INTERVAL: Duration = Duration::from_millis(500);

/// Longest uninterrupted sleep while waiting.
const POLL_SLICE: Duration = Duration::from_millis(25);

/// Shared cancellation flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    Cancelled,
    DeadlinePassed,
}

/// Enforces a minimum interval between consecutive dispatches.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_dispatch: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_dispatch: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How long a dispatch at `now` would have to wait.
    pub fn delay_from(&self, now: Instant) -> Duration {
        match self.last_dispatch {
            Some(last) => last
                .checked_add(self.interval)
                .map_or(Duration::MAX, |next| next.saturating_duration_since(now)),
            None => Duration::ZERO,
        }
    }

    /// Blocks until the next dispatch slot and claims it.
    ///
    /// The slot is only claimed when the outcome is [`WaitOutcome::Ready`].
    pub fn acquire(&mut self, cancel: &CancellationToken, deadline: Option<Instant>) -> WaitOutcome {
        let delay = self.delay_from(Instant::now());
        let outcome = sleep_interruptibly(delay, cancel, deadline);
        if outcome == WaitOutcome::Ready {
            self.last_dispatch = Some(Instant::now());
        }
        outcome
    }
}

/// Sleeps for `duration`, waking early on cancellation or deadline expiry.
///
/// A duration too long to represent as an [`Instant`] only ends on
/// cancellation or at the deadline.
pub fn sleep_interruptibly(
    duration: Duration,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> WaitOutcome {
    let until = Instant::now().checked_add(duration);
    loop {
        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        let now = Instant::now();
        if deadline.is_some_and(|deadline| now >= deadline) {
            return WaitOutcome::DeadlinePassed;
        }
        let remaining = match until {
            Some(until) if now >= until => return WaitOutcome::Ready,
            Some(until) => until - now,
            None => POLL_SLICE,
        };
        std::thread::sleep(remaining.min(POLL_SLICE));
    }
}
