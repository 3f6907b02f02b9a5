//! Runtime configuration from environment variables.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `POMOTASK_DATA_DIR` | platform data dir | Directory holding `pomotask.db` |
//! | `POMOTASK_TICK_MS` | 1000 | Timer heartbeat in milliseconds (50-60000) |
//! | `POMOTASK_LOG` | `warn` | Log filter, `RUST_LOG` syntax |
//!
//! Command-line flags override the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::persistence::Database;

const DEFAULT_TICK_MS: u64 = 1000;
const MIN_TICK_MS: u64 = 50;
const MAX_TICK_MS: u64 = 60_000;
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub tick_interval: Duration,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("POMOTASK_DATA_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(Database::default_data_dir);

        let tick_ms = match lookup("POMOTASK_TICK_MS") {
            Some(raw) => parse_tick_ms(&raw)?,
            None => DEFAULT_TICK_MS,
        };

        let log_filter = lookup("POMOTASK_LOG")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            data_dir,
            tick_interval: Duration::from_millis(tick_ms),
            log_filter,
        })
    }
}

fn parse_tick_ms(raw: &str) -> Result<u64, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: "POMOTASK_TICK_MS".to_string(),
        message,
    };
    let ms: u64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid(format!("'{}' is not a number", raw)))?;
    if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&ms) {
        return Err(invalid(format!(
            "must be between {} and {}",
            MIN_TICK_MS, MAX_TICK_MS
        )));
    }
    Ok(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.data_dir, Database::default_data_dir());
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("POMOTASK_DATA_DIR", "/tmp/pomotask"),
            ("POMOTASK_TICK_MS", "250"),
            ("POMOTASK_LOG", "pomotask=debug"),
        ])
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/pomotask"));
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.log_filter, "pomotask=debug");
    }

    #[test]
    fn test_invalid_tick() {
        assert!(matches!(
            config_from(&[("POMOTASK_TICK_MS", "fast")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(config_from(&[("POMOTASK_TICK_MS", "10")]).is_err());
        assert!(config_from(&[("POMOTASK_TICK_MS", "60001")]).is_err());
    }

    #[test]
    fn test_empty_values_fall_back() {
        let config = config_from(&[("POMOTASK_DATA_DIR", ""), ("POMOTASK_LOG", "")]).unwrap();
        assert_eq!(config.data_dir, Database::default_data_dir());
        assert_eq!(config.log_filter, "warn");
    }
}
