use std::time::Duration;

/// Timing policy for one watcher
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Delay after any detected change
    pub min_delay: Duration,
    /// Ceiling for the doubling delay while nothing changes
    pub max_delay: Duration,
    /// Consecutive failures that end the watcher
    pub strike_limit: u32,
    /// Pause per accumulated strike before retrying
    pub strike_pause: Duration,
}

/// Configuration for the whole watcher hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub strike_limit: u32,
    pub strike_pause: Duration,
    /// Buffer size of the event channels
    pub channel_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            strike_limit: 3,
            strike_pause: Duration::from_secs(1),
            channel_capacity: 256,
        }
    }
}

impl WatchConfig {
    /// Policy for the room list poller
    pub fn rooms(&self) -> PollConfig {
        self.scaled(1)
    }

    /// Policy for each room's membership poller
    pub fn users(&self) -> PollConfig {
        self.scaled(2)
    }

    /// Policy for each room's message poller
    pub fn messages(&self) -> PollConfig {
        self.scaled(4)
    }

    fn scaled(&self, divisor: u32) -> PollConfig {
        PollConfig {
            min_delay: self.min_delay,
            max_delay: (self.max_delay / divisor).max(self.min_delay),
            strike_limit: self.strike_limit,
            strike_pause: self.strike_pause,
        }
    }
}
