//! Leading-edge throttle.
//!
//! The first call opens a window of `interval`. Calls landing inside the
//! window are dropped, not queued, and nothing fires when the window closes.
//! Cursor events arrive far faster than the effect needs to react, so the
//! surplus is discarded on purpose.

use std::time::Duration;

/// A time window that admits one call at its leading edge.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_admitted: Option<Duration>,
    admitted: u64,
    dropped: u64,
}

impl Throttle {
    /// Creates a throttle admitting at most one call per `interval`.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admitted: None,
            admitted: 0,
            dropped: 0,
        }
    }

    /// Tries to pass through at time `now` (host clock, monotonic).
    ///
    /// Returns `true` if the call is admitted. A clock that runs backwards
    /// reopens the window.
    pub fn try_admit(&mut self, now: Duration) -> bool {
        let open = match self.last_admitted {
            None => true,
            Some(last) => now < last || now - last >= self.interval,
        };
        if open {
            self.last_admitted = Some(now);
            self.admitted += 1;
        } else {
            self.dropped += 1;
        }
        open
    }

    /// Forgets the current window.
    pub fn reset(&mut self) {
        self.last_admitted = None;
    }

    /// The window length.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Calls admitted so far.
    #[must_use]
    pub const fn admitted(&self) -> u64 {
        self.admitted
    }

    /// Calls dropped so far.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }
}
