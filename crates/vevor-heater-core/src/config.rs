//! Session configuration
//!
//! Settings are plain JSON; any key left out falls back to its default.
//!
//! ```json
//! {
//!   "address": "AA:BB:CC:DD:EE:FF",
//!   "response_timeout_ms": 5000,
//!   "characteristic": "0000ffe1-0000-1000-8000-00805f9b34fb"
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::{DEFAULT_TIMEOUT_MS, HEATER_CONTROL_CHARACTERISTIC};

/// Errors that can occur while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid config JSON
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings for a [`HeaterSession`](crate::protocol::HeaterSession)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Expected device address. `None` trusts whatever the transport is connected to.
    pub address: Option<String>,

    /// How long to wait for a matching status notification, in milliseconds
    pub response_timeout_ms: u64,

    /// Control characteristic. The session does not open it itself; a
    /// transport implementation reads it through
    /// [`HeaterSession::characteristic`](crate::protocol::HeaterSession::characteristic).
    pub characteristic: Uuid,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: None,
            response_timeout_ms: DEFAULT_TIMEOUT_MS,
            characteristic: HEATER_CONTROL_CHARACTERISTIC,
        }
    }
}

impl SessionConfig {
    /// Config pinned to a device address, everything else default
    pub fn for_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Default::default()
        }
    }

    /// Override the response timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.response_timeout_ms = timeout_ms;
        self
    }

    /// Response timeout as a [`Duration`]
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Parse a config from JSON text
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write the config as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
