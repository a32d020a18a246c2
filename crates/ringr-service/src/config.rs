//! Service configuration loaded from environment variables.

use crate::error::RingrError;
use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Record expiry used when `RINGR__TTL` is absent or not a positive integer.
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Handler settings (auth secret, table, topic, TTL, default message)
    #[serde(default)]
    pub ringr: RingrConfig,

    /// Channel gateway configuration
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Expiry sweeper configuration
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// Values the handlers need at request time.
///
/// Every field is optional so a missing variable does not stop the process;
/// each handler reports the variables it needs as a 500 envelope instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RingrConfig {
    /// Shared secret callers must present as `auth_key`
    pub auth_key: Option<SecretString>,

    /// Record store table holding endpoint records
    pub table_name: Option<String>,

    /// Broadcast topic endpoints are subscribed to
    pub topic: Option<String>,

    /// Record expiry in seconds
    pub ttl: Option<String>,

    /// Message broadcast when the caller does not supply one
    pub default_message: Option<String>,
}

impl RingrConfig {
    pub fn auth_key(&self) -> Result<&SecretString, RingrError> {
        self.auth_key
            .as_ref()
            .ok_or(RingrError::MissingConfig("auth_key"))
    }

    pub fn table_name(&self) -> Result<&str, RingrError> {
        self.table_name
            .as_deref()
            .ok_or(RingrError::MissingConfig("table_name"))
    }

    pub fn topic(&self) -> Result<&str, RingrError> {
        self.topic
            .as_deref()
            .ok_or(RingrError::MissingConfig("topic"))
    }

    pub fn default_message(&self) -> Result<&str, RingrError> {
        self.default_message
            .as_deref()
            .ok_or(RingrError::MissingConfig("default_message"))
    }

    /// Record expiry, falling back to [`DEFAULT_TTL_SECS`].
    pub fn ttl(&self) -> chrono::Duration {
        let secs = match self.ttl.as_deref().map(|t| t.trim().parse::<i64>()) {
            Some(Ok(secs)) if secs > 0 => secs,
            Some(_) => {
                warn!(
                    "Invalid ttl {:?}, using {} seconds",
                    self.ttl, DEFAULT_TTL_SECS
                );
                DEFAULT_TTL_SECS
            }
            None => DEFAULT_TTL_SECS,
        };
        chrono::Duration::seconds(secs)
    }

    /// Names of the handler variables that are not set.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.auth_key.is_none() {
            missing.push("auth_key");
        }
        if self.table_name.is_none() {
            missing.push("table_name");
        }
        if self.topic.is_none() {
            missing.push("topic");
        }
        if self.ttl.is_none() {
            missing.push("ttl");
        }
        if self.default_message.is_none() {
            missing.push("default_message");
        }
        missing
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Pub/sub gateway URL. Without one the service uses an in-process channel.
    pub api_url: Option<String>,

    /// Gateway request timeout
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    /// How often expired records are purged
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Global requests per minute
    #[serde(default = "default_global_rpm")]
    pub global_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default implementations
impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout: default_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: default_sweep_interval(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: default_global_rpm(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_global_rpm() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    // Phone numbers and secrets stay strings
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ringr_config(ttl: Option<&str>) -> RingrConfig {
        RingrConfig {
            auth_key: Some(SecretString::new("secret".into())),
            table_name: Some("ringr".into()),
            topic: Some("ringr-topic".into()),
            ttl: ttl.map(String::from),
            default_message: Some("Ring ring".into()),
        }
    }

    #[test]
    fn test_ttl_parsing() {
        assert_eq!(ringr_config(Some("120")).ttl(), chrono::Duration::seconds(120));
        assert_eq!(ringr_config(Some(" 60 ")).ttl(), chrono::Duration::seconds(60));
    }

    #[test]
    fn test_ttl_fallback() {
        let fallback = chrono::Duration::seconds(DEFAULT_TTL_SECS);
        assert_eq!(ringr_config(None).ttl(), fallback);
        assert_eq!(ringr_config(Some("soon")).ttl(), fallback);
        assert_eq!(ringr_config(Some("-5")).ttl(), fallback);
        assert_eq!(ringr_config(Some("0")).ttl(), fallback);
    }

    #[test]
    fn test_missing_values() {
        let config = RingrConfig::default();
        assert_eq!(
            config.missing(),
            vec!["auth_key", "table_name", "topic", "ttl", "default_message"]
        );
        assert!(matches!(
            config.topic(),
            Err(RingrError::MissingConfig("topic"))
        ));

        assert!(ringr_config(Some("60")).missing().is_empty());
    }

    #[test]
    fn test_deserialize_from_map() {
        let json = serde_json::json!({
            "ringr": {
                "auth_key": "secret",
                "table_name": "ringr",
                "topic": "ringr-topic",
                "ttl": "600"
            },
            "sweeper": { "interval": "5s" },
            "server": { "port": 9000 }
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.ringr.table_name.as_deref(), Some("ringr"));
        assert_eq!(config.ringr.missing(), vec!["default_message"]);
        assert_eq!(config.sweeper.interval, Duration::from_secs(5));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.channel.timeout, Duration::from_secs(30));
        assert!(config.channel.api_url.is_none());
    }
}
