//! Configuration loaded from `DBPULSE_*` environment variables
//!
//! ```bash
//! DBPULSE_BIND_ADDR=0.0.0.0:8000
//! DBPULSE_DATABASE_URL=sqlite://test.db?mode=rwc
//! DBPULSE_POLL_INTERVAL_MS=2000
//! DBPULSE_HEARTBEAT_SECS=30
//! ```
//!
//! A `.env` file in the working directory is read first, if present.

use dbpulse_ws::WsHeartbeatConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Prefix shared by every configuration variable
pub const ENV_PREFIX: &str = "DBPULSE_";

/// Error type for configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable could not be parsed into its field type
    #[error("Configuration error: {0}")]
    Env(#[from] envy::Error),

    /// A variable parsed but holds an unusable value
    #[error("Invalid value for DBPULSE_{key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server listens on
    pub bind_addr: String,
    /// sqlx SQLite connection URL of the watched database
    pub database_url: String,
    /// Poll period in milliseconds
    pub poll_interval_ms: u64,
    /// WebSocket ping interval in seconds, `0` disables heartbeats
    pub heartbeat_secs: u64,
    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Broadcast a non-empty store on the first poll after startup
    pub announce_initial: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            database_url: "sqlite://test.db?mode=rwc".to_string(),
            poll_interval_ms: 2000,
            heartbeat_secs: 30,
            log_filter: "info,dbpulse=debug".to_string(),
            announce_initial: true,
        }
    }
}

impl Config {
    /// Load `.env` (if any), then read the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_vars(std::env::vars())
    }

    /// Build from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Config = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "POLL_INTERVAL_MS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Err(e) = self.bind_addr.parse::<SocketAddr>() {
            return Err(ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            });
        }
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "DATABASE_URL",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Heartbeat settings for accepted WebSockets, `None` when disabled
    pub fn heartbeat(&self) -> Option<WsHeartbeatConfig> {
        WsHeartbeatConfig::every_secs(self.heartbeat_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_vars(vars(&[("PATH", "/usr/bin")])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(
            config.heartbeat().map(|h| h.interval),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn prefixed_variables_override_defaults() {
        let config = Config::from_vars(vars(&[
            ("DBPULSE_BIND_ADDR", "0.0.0.0:9000"),
            ("DBPULSE_POLL_INTERVAL_MS", "250"),
            ("DBPULSE_HEARTBEAT_SECS", "0"),
            ("DBPULSE_ANNOUNCE_INITIAL", "false"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert!(config.heartbeat().is_none());
        assert!(!config.announce_initial);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = Config::from_vars(vars(&[("DBPULSE_POLL_INTERVAL_MS", "0")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "POLL_INTERVAL_MS",
                ..
            }
        ));
    }

    #[test]
    fn malformed_values_are_reported() {
        assert!(matches!(
            Config::from_vars(vars(&[("DBPULSE_POLL_INTERVAL_MS", "soon")])),
            Err(ConfigError::Env(_))
        ));
        assert!(matches!(
            Config::from_vars(vars(&[("DBPULSE_BIND_ADDR", "localhost")])),
            Err(ConfigError::Invalid { key: "BIND_ADDR", .. })
        ));
    }
}
