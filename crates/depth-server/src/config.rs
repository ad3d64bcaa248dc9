//! Configuration for the depth TCP server.
//!
//! Values are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (`--config`)
//! 3. environment variables:
//!    - `DEPTH_BIND_ADDR`   (default: "0.0.0.0")
//!    - `DEPTH_PORT`        (default: "9100")
//!    - `DEPTH_MAX_CLIENTS` (default: "1024")
//!    - `DEPTH_FEED_QUEUE`  (default: "4096")
//! 4. command-line flags (applied by `main`)

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidEnv {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// Capacity of the queue between feed connections and the writer task.
    /// A full queue back-pressures feed connections.
    pub feed_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 9100,
            max_clients: 1024,
            feed_queue_capacity: 4096,
        }
    }
}

impl Config {
    /// Defaults, then the TOML file at `path` (if any), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Config::from_toml_str(&text)?
            }
            None => Config::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `DEPTH_*` overrides looked up through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("DEPTH_BIND_ADDR") {
            self.bind_addr = addr;
        }
        read_override(&lookup, "DEPTH_PORT", &mut self.port)?;
        read_override(&lookup, "DEPTH_MAX_CLIENTS", &mut self.max_clients)?;
        read_override(&lookup, "DEPTH_FEED_QUEUE", &mut self.feed_queue_capacity)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::Zero("max_clients"));
        }
        // tokio's bounded channel panics on a zero capacity.
        if self.feed_queue_capacity == 0 {
            return Err(ConfigError::Zero("feed_queue_capacity"));
        }
        Ok(())
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_override<T, F>(lookup: &F, key: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(key) {
        *slot = value.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnv {
            key,
            value: value.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}
