use clap::Parser;
use std::time::Duration;

use crate::shared::AppError;
use crate::watch::WatchConfig;

/// Longest accepted room list delay
const MAX_DELAY_LIMIT: Duration = Duration::from_secs(24 * 60 * 60);
/// Longest accepted pause per strike
const STRIKE_PAUSE_LIMIT: Duration = Duration::from_secs(60 * 60);

/// Watches a team chat service and prints room, member and message changes
#[derive(Debug, Clone, Parser)]
#[command(name = "roomwatch", version)]
pub struct Args {
    /// Collection URL of the chat service
    #[arg(long, env = "ROOMWATCH_URL")]
    pub url: String,

    #[arg(long, env = "ROOMWATCH_USER")]
    pub user: String,

    #[arg(long, env = "ROOMWATCH_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Poll delay after a change, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub min_delay_ms: u64,

    /// Upper bound of the room list poll delay, in seconds
    #[arg(long, default_value_t = 60)]
    pub max_delay_secs: u64,

    /// Consecutive failures after which a watcher gives up
    #[arg(long, default_value_t = 3)]
    pub strike_limit: u32,

    /// Pause per failure before retrying, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub strike_pause_ms: u64,

    #[arg(long, default_value_t = 256)]
    pub channel_capacity: usize,
}

impl TryFrom<&Args> for WatchConfig {
    type Error = AppError;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let config = WatchConfig {
            min_delay: Duration::from_millis(args.min_delay_ms),
            max_delay: Duration::from_secs(args.max_delay_secs),
            strike_limit: args.strike_limit,
            strike_pause: Duration::from_millis(args.strike_pause_ms),
            channel_capacity: args.channel_capacity,
        };

        if config.min_delay.is_zero() {
            return Err(AppError::Config("min delay must be positive".to_string()));
        }
        if config.min_delay > config.max_delay {
            return Err(AppError::Config(format!(
                "min delay {:?} exceeds max delay {:?}",
                config.min_delay, config.max_delay
            )));
        }
        if config.max_delay > MAX_DELAY_LIMIT {
            return Err(AppError::Config(format!(
                "max delay {:?} exceeds {:?}",
                config.max_delay, MAX_DELAY_LIMIT
            )));
        }
        if config.strike_pause > STRIKE_PAUSE_LIMIT {
            return Err(AppError::Config(format!(
                "strike pause {:?} exceeds {:?}",
                config.strike_pause, STRIKE_PAUSE_LIMIT
            )));
        }
        if config.strike_limit == 0 {
            return Err(AppError::Config("strike limit must be at least 1".to_string()));
        }
        if config.channel_capacity == 0 {
            return Err(AppError::Config("channel capacity must be positive".to_string()));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "roomwatch",
            "--url",
            "https://tfs.example/tfs/Default",
            "--user",
            "ann",
            "--password",
            "secret",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_match_watch_config_default() {
        let config = WatchConfig::try_from(&parse(&[])).unwrap();
        assert_eq!(config, WatchConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config =
            WatchConfig::try_from(&parse(&["--min-delay-ms", "250", "--strike-limit", "5"])).unwrap();

        assert_eq!(config.min_delay, Duration::from_millis(250));
        assert_eq!(config.strike_limit, 5);
    }

    #[test]
    fn test_rejects_inverted_delays() {
        let result = WatchConfig::try_from(&parse(&["--min-delay-ms", "120000", "--max-delay-secs", "60"]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_rejects_unbounded_timings() {
        let delay = WatchConfig::try_from(&parse(&["--max-delay-secs", "18446744073709551615"]));
        assert!(matches!(delay, Err(AppError::Config(_))));

        let pause = WatchConfig::try_from(&parse(&["--strike-pause-ms", "18446744073709551615"]));
        assert!(matches!(pause, Err(AppError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_strike_limit() {
        let result = WatchConfig::try_from(&parse(&["--strike-limit", "0"]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
