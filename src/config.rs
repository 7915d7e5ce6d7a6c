use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://rolecase.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// How extracted text is handed to the parse service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// One long request whose response body is the result.
    Sync,
    /// Start a remote task, then poll its status.
    Poll,
}

impl FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(ParseMode::Sync),
            "poll" => Ok(ParseMode::Poll),
            other => Err(format!("expected 'sync' or 'poll', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub api_token: Option<String>,
    pub parse_mode: ParseMode,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
    pub parse_timeout: Duration,
    pub keepalive_interval: Duration,
    /// How long a failed result write keeps being retried before it is given up.
    pub store_retry_window: Duration,
    pub database_url: String,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: DEFAULT_API_BASE.to_string(),
            api_token: None,
            parse_mode: ParseMode::Poll,
            poll_interval: Duration::from_secs(2),
            poll_max_attempts: 150,
            parse_timeout: Duration::from_secs(300),
            keepalive_interval: Duration::from_secs(20),
            store_retry_window: Duration::from_secs(30),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl Config {
    /// Build the configuration from the environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reading keys through `lookup`, so callers can
    /// supply values from somewhere other than the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let parse_mode = match value("ROLECASE_PARSE_MODE") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::Invalid {
                key: "ROLECASE_PARSE_MODE",
                message,
            })?,
            None => defaults.parse_mode,
        };

        let poll_max_attempts = parse_number(value("ROLECASE_POLL_MAX_ATTEMPTS"), "ROLECASE_POLL_MAX_ATTEMPTS")?
            .unwrap_or(defaults.poll_max_attempts);
        if poll_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "ROLECASE_POLL_MAX_ATTEMPTS",
                message: "must be at least 1".to_string(),
            });
        }

        let poll_interval = parse_number::<u64>(value("ROLECASE_POLL_INTERVAL_MS"), "ROLECASE_POLL_INTERVAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);
        let parse_timeout = parse_number::<u64>(value("ROLECASE_PARSE_TIMEOUT_SECS"), "ROLECASE_PARSE_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.parse_timeout);
        let keepalive_interval = parse_number::<u64>(value("ROLECASE_KEEPALIVE_SECS"), "ROLECASE_KEEPALIVE_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.keepalive_interval);
        let store_retry_window = parse_number::<u64>(value("ROLECASE_STORE_RETRY_MS"), "ROLECASE_STORE_RETRY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.store_retry_window);

        Ok(Config {
            api_base: value("ROLECASE_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            api_token: value("ROLECASE_API_TOKEN"),
            parse_mode,
            poll_interval,
            poll_max_attempts,
            parse_timeout,
            keepalive_interval,
            store_retry_window,
            database_url: value("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: value("BIND_ADDR").unwrap_or(defaults.bind_addr),
        })
    }
}

fn parse_number<T>(raw: Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|v| {
        v.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            message: format!("'{}': {}", v, e),
        })
    })
    .transpose()
}
