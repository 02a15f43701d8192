use std::env;

use thiserror::Error;
use tokio::time::Duration;

pub const DEFAULT_CATEGORY_NAME: &str = "on-demand voice";
pub const DEFAULT_COMMAND_CHANNEL: &str = "requests";
pub const DEFAULT_CLEANUP_WINDOW: Duration = Duration::from_secs(48 * 3600);
pub const DEFAULT_FIRST_JOIN_WINDOW: Duration = Duration::from_secs(60);
pub const DEFAULT_COMMAND_PREFIX: &str = "!";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("{key} is not a valid duration ({value:?}): {source}")]
    InvalidDuration {
        key: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("VOICE_CLEANUP_WINDOW must be longer than zero")]
    ZeroCleanupWindow,
}

/// Settings for the self-serve voice feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Category in which self-serve voice channels live (matched case-insensitively).
    pub category_name: String,
    /// Text channel that accepts commands. The managed category is searched first.
    pub command_channel_name: String,
    /// How long an unused voice channel is kept around.
    pub cleanup_window: Duration,
    /// How long a freshly created channel may wait for its first visitor.
    /// `None` falls back to `cleanup_window`.
    pub first_join_window: Option<Duration>,
    pub command_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            category_name: DEFAULT_CATEGORY_NAME.to_string(),
            command_channel_name: DEFAULT_COMMAND_CHANNEL.to_string(),
            cleanup_window: DEFAULT_CLEANUP_WINDOW,
            first_join_window: Some(DEFAULT_FIRST_JOIN_WINDOW),
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(name) = lookup("VOICE_CATEGORY_NAME") {
            config.category_name = non_empty("VOICE_CATEGORY_NAME", name)?;
        }
        if let Some(name) = lookup("VOICE_COMMAND_CHANNEL") {
            config.command_channel_name = non_empty("VOICE_COMMAND_CHANNEL", name)?;
        }
        if let Some(prefix) = lookup("COMMAND_PREFIX") {
            config.command_prefix = non_empty("COMMAND_PREFIX", prefix)?;
        }
        if let Some(value) = lookup("VOICE_CLEANUP_WINDOW") {
            config.cleanup_window = parse_duration("VOICE_CLEANUP_WINDOW", value)?;
        }
        if config.cleanup_window.is_zero() {
            return Err(ConfigError::ZeroCleanupWindow);
        }
        if let Some(value) = lookup("VOICE_FIRST_JOIN_WINDOW") {
            config.first_join_window = match value.trim().to_lowercase().as_str() {
                "off" | "none" | "disabled" => None,
                _ => Some(parse_duration("VOICE_FIRST_JOIN_WINDOW", value)?),
            };
        }

        Ok(config)
    }

    /// Grace window for a channel nobody has joined yet.
    pub fn first_join_window(&self) -> Duration {
        self.first_join_window.unwrap_or(self.cleanup_window)
    }
}

pub fn discord_token() -> Result<String, ConfigError> {
    env::var("DISCORD_TOKEN").map_err(|_| ConfigError::MissingEnvVar("DISCORD_TOKEN"))
}

fn non_empty(key: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty(key));
    }
    Ok(trimmed.to_string())
}

fn parse_duration(key: &'static str, value: String) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|source| ConfigError::InvalidDuration {
        key,
        value,
        source,
    })
}
