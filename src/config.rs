//! Configuration management for Turnstile.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::ratelimit::KeyStrategy;

/// Main configuration for the Turnstile service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server listens on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:8000".parse().unwrap()
}

/// Rate limiting configuration.
///
/// One limit applies to every key; capacity and refill rate are fixed at
/// startup and not runtime-reloadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// How request identity is derived for partitioning
    #[serde(default)]
    pub strategy: KeyStrategy,

    /// Maximum tokens a bucket can hold (burst size)
    #[serde(default = "default_capacity")]
    pub capacity: f64,

    /// Tokens refilled per second
    #[serde(default = "default_refill_rate")]
    pub refill_rate: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            strategy: KeyStrategy::default(),
            capacity: default_capacity(),
            refill_rate: default_refill_rate(),
        }
    }
}

fn default_capacity() -> f64 {
    10.0
}

fn default_refill_rate() -> f64 {
    1.0
}

impl Config {
    /// Load configuration from a file path.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| crate::error::TurnstileError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject non-positive bucket parameters.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.rate_limit.capacity <= 0.0 {
            return Err(crate::error::TurnstileError::Config(format!(
                "capacity must be positive, got {}",
                self.rate_limit.capacity
            )));
        }
        if self.rate_limit.refill_rate <= 0.0 {
            return Err(crate::error::TurnstileError::Config(format!(
                "refill_rate must be positive, got {}",
                self.rate_limit.refill_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.listen_addr.port(), 8000);
        assert_eq!(config.rate_limit.strategy, KeyStrategy::OriginAddress);
        assert_eq!(config.rate_limit.capacity, 10.0);
        assert_eq!(config.rate_limit.refill_rate, 1.0);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
server:
  listen_addr: "0.0.0.0:9000"
rate_limit:
  strategy: host-header
  capacity: 5
  refill_rate: 0.5
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.listen_addr.port(), 9000);
        assert_eq!(config.rate_limit.strategy, KeyStrategy::HostHeader);
        assert_eq!(config.rate_limit.capacity, 5.0);
        assert_eq!(config.rate_limit.refill_rate, 0.5);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
rate_limit:
  capacity: 100
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.listen_addr.port(), 8000);
        assert_eq!(config.rate_limit.capacity, 100.0);
        assert_eq!(config.rate_limit.refill_rate, 1.0);
    }

    #[test]
    fn test_validate_rejects_non_positive_capacity() {
        let mut config = Config::default();
        config.rate_limit.capacity = 0.0;
        assert!(config.validate().is_err());

        config.rate_limit.capacity = 10.0;
        config.rate_limit.refill_rate = -1.0;
        assert!(config.validate().is_err());
    }
}
