//! Inactivity watchdog.
//!
//! Every user action resets the timer.  What happens on expiry is decided by
//! [`IdlePolicy`].

use std::time::{Duration, Instant};

/// Reaction to an expired idle timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdlePolicy {
    /// End the session immediately.
    Logout,
    /// Ask the user to continue; end the session if nobody answers within
    /// `grace`.
    Prompt { grace: Duration },
}

/// Longest wait the watchdog schedules; about 30 years.
pub const MAX_IDLE_HORIZON: Duration = Duration::from_secs(30 * 365 * 24 * 3600);

#[derive(Debug, Clone)]
pub struct IdleWatchdog {
    timeout: Duration,
    last_activity: Instant,
}

impl IdleWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self::started_at(timeout, Instant::now())
    }

    pub fn started_at(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_activity: now,
        }
    }

    pub fn record_activity(&mut self) {
        self.record_activity_at(Instant::now());
    }

    pub fn record_activity_at(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Time left before expiry, saturating at zero.
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.timeout
            .saturating_sub(now.saturating_duration_since(self.last_activity))
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.remaining_at(now).is_zero()
    }

    /// Instant at which the watchdog fires if nothing happens.  Timeouts
    /// too large for the clock are capped at [`MAX_IDLE_HORIZON`].
    pub fn deadline(&self) -> Instant {
        self.last_activity
            .checked_add(self.timeout.min(MAX_IDLE_HORIZON))
            .unwrap_or(self.last_activity)
    }
}
