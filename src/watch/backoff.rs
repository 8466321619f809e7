use std::time::Duration;

use super::config::PollConfig;
use crate::shared::AppError;

/// Adaptive polling delay: doubles while nothing changes, snaps back on change
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            current: min,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = self.min;
    }

    pub fn escalate(&mut self) {
        self.current = self
            .current
            .checked_mul(2)
            .map_or(self.max, |doubled| doubled.min(self.max));
    }
}

/// Combines the adaptive delay with the consecutive-failure count
///
/// Every watcher asks its schedule how long to wait before the next poll.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    backoff: Backoff,
    strikes: u32,
    strike_limit: u32,
    strike_pause: Duration,
}

impl PollSchedule {
    pub fn new(config: &PollConfig) -> Self {
        Self {
            backoff: Backoff::new(config.min_delay, config.max_delay),
            strikes: 0,
            strike_limit: config.strike_limit,
            strike_pause: config.strike_pause,
        }
    }

    /// Delay before the first poll
    pub fn current(&self) -> Duration {
        self.backoff.current()
    }

    pub fn strikes(&self) -> u32 {
        self.strikes
    }

    /// Books a successful poll and returns the delay before the next one
    pub fn succeeded(&mut self, changed: bool) -> Duration {
        if self.strikes > 0 {
            self.strikes = 0;
            self.backoff.reset();
        }

        if changed {
            self.backoff.reset();
        } else {
            self.backoff.escalate();
        }
        self.backoff.current()
    }

    /// Books a failed poll.
    ///
    /// Returns the pause before retrying, or the error that ends the watcher:
    /// errors that retrying cannot fix end it at once, the rest once the strike
    /// limit is hit.
    pub fn failed(&mut self, err: AppError) -> Result<Duration, AppError> {
        if !err.is_retryable() {
            return Err(err);
        }

        self.strikes += 1;
        if self.strikes >= self.strike_limit {
            return Err(AppError::StrikeLimit {
                strikes: self.strikes,
                last: err.to_string(),
            });
        }

        Ok(self.strike_pause.saturating_mul(self.strikes))
    }
}
