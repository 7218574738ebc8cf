//! Configuration management for redwork.
//!
//! Configuration can be built in code, loaded from a TOML file, or read from
//! `REDWORK_*` environment variables.
//!
//! ```toml
//! [redis]
//! url = "redis://127.0.0.1:6379/0"
//! key_prefix = "rmq"
//!
//! [collector]
//! concurrency = 4
//! collect_timeout = "5s"
//!
//! [dashboard]
//! bind_address = "0.0.0.0"
//! port = 8080
//!
//! [logging]
//! level = "info"
//! ```

use crate::{collector::CollectorConfig, keys::{DEFAULT_KEY_PREFIX, KeyLayout}};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Serde format for timeouts: `"250ms"`, `"30s"`, `"5m"`, `"1h"`, `"1d"` or a
/// bare number of seconds. Serialization picks the largest unit that divides
/// the value exactly.
pub(crate) mod timeout_format {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    const UNITS: [(&str, u128); 4] = [("d", 86_400_000), ("h", 3_600_000), ("m", 60_000), ("s", 1_000)];

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(D::Error::custom)
    }

    pub(crate) fn format_duration(duration: Duration) -> String {
        let millis = duration.as_millis();
        if millis == 0 {
            return "0s".to_string();
        }
        UNITS
            .iter()
            .find(|(_, unit)| millis % unit == 0)
            .map(|(suffix, unit)| format!("{}{}", millis / unit, suffix))
            .unwrap_or_else(|| format!("{}ms", millis))
    }

    pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();

        if let Ok(secs) = s.parse::<u64>() {
            return Ok(Duration::from_secs(secs));
        }
        if let Some(millis) = s.strip_suffix("ms") {
            return millis
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| format!("Invalid number in duration: {}", millis));
        }

        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .filter(|&at| at > 0)
            .ok_or_else(|| format!("Invalid duration format: {}", s))?;
        let (num_str, suffix) = s.split_at(split);
        let num: u64 = num_str
            .parse()
            .map_err(|_| format!("Invalid number in duration: {}", num_str))?;

        let unit = UNITS
            .iter()
            .find(|(name, _)| *name == suffix)
            .map(|(_, unit)| *unit as u64)
            .ok_or_else(|| format!("Invalid duration suffix: {}. Use ms, s, m, h or d", suffix))?;
        num.checked_mul(unit)
            .map(Duration::from_millis)
            .ok_or_else(|| format!("Duration out of range: {}", s))
    }
}

/// Main configuration.
///
/// # Examples
///
/// ```rust
/// use redwork::config::RedworkConfig;
///
/// let config = RedworkConfig::new()
///     .with_redis_url("redis://cache.internal:6379/2")
///     .with_key_prefix("billing")
///     .with_concurrency(4);
///
/// assert_eq!(config.redis.key_prefix, "billing");
/// assert_eq!(config.collector.concurrency, 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedworkConfig {
    /// Redis connection settings
    pub redis: RedisConfig,

    /// Statistics collection settings
    pub collector: CollectorConfig,

    /// HTTP dashboard settings
    pub dashboard: DashboardConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl RedworkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_redis_url(mut self, url: &str) -> Self {
        self.redis.url = url.to_string();
        self
    }

    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.redis.key_prefix = prefix.to_string();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.collector = self.collector.with_concurrency(concurrency);
        self
    }

    pub fn with_collect_timeout(mut self, timeout: Duration) -> Self {
        self.collector = self.collector.with_collect_timeout(timeout);
        self
    }

    pub fn with_dashboard_address(mut self, bind_address: &str, port: u16) -> Self {
        self.dashboard.bind_address = bind_address.to_string();
        self.dashboard.port = port;
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::default().merge_env()
    }

    /// Override fields from `REDWORK_*` environment variables when present.
    pub fn merge_env(mut self) -> crate::Result<Self> {
        if let Ok(url) = std::env::var("REDWORK_REDIS_URL") {
            self.redis.url = url;
        }
        if let Ok(prefix) = std::env::var("REDWORK_KEY_PREFIX") {
            self.redis.key_prefix = prefix;
        }

        if let Ok(concurrency) = std::env::var("REDWORK_COLLECT_CONCURRENCY") {
            let concurrency = concurrency.parse().map_err(|_| {
                crate::RedworkError::Config(format!(
                    "REDWORK_COLLECT_CONCURRENCY must be a positive integer, got {}",
                    concurrency
                ))
            })?;
            self.collector = self.collector.with_concurrency(concurrency);
        }
        if let Ok(timeout) = std::env::var("REDWORK_COLLECT_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                self.collector.collect_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(bind_address) = std::env::var("REDWORK_DASHBOARD_BIND") {
            self.dashboard.bind_address = bind_address;
        }
        if let Ok(port) = std::env::var("REDWORK_DASHBOARD_PORT") {
            self.dashboard.port = port.parse().unwrap_or(self.dashboard.port);
        }

        Ok(self)
    }
}

/// Redis configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Prefix shared by every queue and connection key
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl RedisConfig {
    pub fn key_layout(&self) -> KeyLayout {
        KeyLayout::new(self.key_prefix.clone())
    }
}

/// Dashboard server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl DashboardConfig {
    pub fn socket_addr(&self) -> crate::Result<std::net::SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| {
                crate::RedworkError::Config(format!(
                    "Invalid dashboard address {}:{}: {}",
                    self.bind_address, self.port, e
                ))
            })
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Whether to enable structured JSON logging
    pub json_format: bool,

    /// Whether to include file and line information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}
