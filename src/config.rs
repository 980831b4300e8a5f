use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;
use thiserror::Error;

const HTTP_ADDR: &str = "DRAFT_HTTP_ADDR";
const BRIDGE_MODE: &str = "DRAFT_BRIDGE_MODE";
const TOPIC: &str = "DRAFT_TOPIC";
const RETENTION_SECS: &str = "DRAFT_RETENTION_SECS";
const RABBIT_URL: &str = "RABBIT_URL";
const APP_ID: &str = "APP_ID";
const CONSUMER_NAME: &str = "DRAFT_CONSUMER_NAME";
const QUEUE_CAPACITY: &str = "DRAFT_QUEUE_CAPACITY";
const KEEPALIVE_SECS: &str = "DRAFT_KEEPALIVE_SECS";
const SEED_FILE: &str = "DRAFT_SEED_FILE";
const CONNECT_ATTEMPTS: &str = "DRAFT_CONNECT_ATTEMPTS";
const CONNECT_BACKOFF_MS: &str = "DRAFT_CONNECT_BACKOFF_MS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key} is required when {requirement}")]
    Missing {
        key: &'static str,
        requirement: &'static str,
    },
}

/// Which event hub backs the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeMode {
    /// In-process bus only; events never leave the process
    Local,
    /// In-process durable-log broker on a loopback port
    #[default]
    Embedded,
    /// External RabbitMQ topic exchange
    Networked,
}

impl FromStr for BridgeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "embedded" => Ok(Self::Embedded),
            "networked" => Ok(Self::Networked),
            other => Err(format!(
                "unknown bridge mode {}, expected local, embedded or networked",
                other
            )),
        }
    }
}

impl fmt::Display for BridgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Local => "local",
            Self::Embedded => "embedded",
            Self::Networked => "networked",
        };
        f.write_str(name)
    }
}

/// Everything the process needs at startup, resolved once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub http_addr: SocketAddr,
    pub bridge_mode: BridgeMode,
    /// Stream name (embedded) or exchange name (networked)
    pub topic: String,
    /// How long the topic keeps messages
    pub retention: Duration,
    pub rabbit_url: Option<String>,
    pub app_id: String,
    /// Durable consumer name; `None` uses an ephemeral queue
    pub consumer_name: Option<String>,
    /// Per-subscriber event queue capacity
    pub queue_capacity: usize,
    /// Idle interval between stream keepalive frames
    pub keepalive: Duration,
    pub seed_file: Option<PathBuf>,
    pub connect_attempts: u32,
    pub connect_backoff: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            bridge_mode: BridgeMode::Embedded,
            topic: "draft.events".to_string(),
            retention: Duration::from_secs(3600),
            rabbit_url: None,
            app_id: "draft-room".to_string(),
            consumer_name: None,
            queue_capacity: 32,
            keepalive: Duration::from_secs(30),
            seed_file: None,
            connect_attempts: 5,
            connect_backoff: Duration::from_millis(200),
        }
    }
}

impl Config {
    /// Reads the configuration from the environment, loading `.env` first if present
    ///
    /// # Errors
    /// Returns an error if a variable is set to a value that cannot be used.
    pub fn try_from_env() -> Result<Config, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, falling back to defaults for unset keys.
    ///
    /// Combinations of values are not checked here; call [`Config::validate`] once command
    /// line overrides have been applied.
    ///
    /// # Errors
    /// Returns an error if a value does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        // Blank values count as unset
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = Config {
            http_addr: parse_or(&get, HTTP_ADDR, defaults.http_addr)?,
            bridge_mode: parse_or(&get, BRIDGE_MODE, defaults.bridge_mode)?,
            topic: get(TOPIC).unwrap_or(defaults.topic),
            retention: parse_or(&get, RETENTION_SECS, defaults.retention.as_secs())
                .map(Duration::from_secs)?,
            rabbit_url: get(RABBIT_URL),
            app_id: get(APP_ID).unwrap_or(defaults.app_id),
            consumer_name: get(CONSUMER_NAME),
            queue_capacity: parse_or(&get, QUEUE_CAPACITY, defaults.queue_capacity)?,
            keepalive: parse_or(&get, KEEPALIVE_SECS, defaults.keepalive.as_secs())
                .map(Duration::from_secs)?,
            seed_file: get(SEED_FILE).map(PathBuf::from),
            connect_attempts: parse_or(&get, CONNECT_ATTEMPTS, defaults.connect_attempts)?,
            connect_backoff: parse_or(
                &get,
                CONNECT_BACKOFF_MS,
                defaults.connect_backoff.as_millis() as u64,
            )
            .map(Duration::from_millis)?,
        };
        Ok(config)
    }

    /// Checks combinations of values, after overrides have been applied
    ///
    /// # Errors
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bridge_mode == BridgeMode::Networked && self.rabbit_url.is_none() {
            return Err(ConfigError::Missing {
                key: RABBIT_URL,
                requirement: "the bridge mode is networked",
            });
        }
        if self.retention.is_zero() {
            return Err(invalid(RETENTION_SECS, "0", "must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid(QUEUE_CAPACITY, "0", "must be at least 1"));
        }
        if self.connect_attempts == 0 {
            return Err(invalid(CONNECT_ATTEMPTS, "0", "must be at least 1"));
        }
        if self.keepalive.is_zero() {
            return Err(invalid(KEEPALIVE_SECS, "0", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|err: T::Err| invalid(key, &value, &err.to_string())),
        None => Ok(default),
    }
}
