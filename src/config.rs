//! Manager configuration.
//!
//! All fields have defaults, so an empty TOML document is a valid configuration:
//!
//! ```toml
//! debug_messages = true
//! min_write_interval_ms = 20
//! shutdown_timeout_ms = 1000
//! max_queue_len = 256   # 0 = unbounded
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MIN_WRITE_INTERVAL_MS: u64 = 20;
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_MAX_QUEUE_LEN: usize = 256;
/// Smallest write interval the writer runs with; lower runtime values are raised to it.
pub const MIN_WRITE_INTERVAL_FLOOR_MS: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Log discovered devices and every report written.
    pub debug_messages: bool,

    /// Minimum time between two output reports, in milliseconds. Must be at least 1.
    pub min_write_interval_ms: u64,

    /// How long `shutdown` waits for the writer thread before detaching it.
    pub shutdown_timeout_ms: u64,

    /// Maximum number of queued reports. `0` disables the bound; the queue then grows
    /// without limit if producers outpace the writer.
    pub max_queue_len: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            debug_messages: false,
            min_write_interval_ms: DEFAULT_MIN_WRITE_INTERVAL_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
            max_queue_len: DEFAULT_MAX_QUEUE_LEN,
        }
    }
}

impl ManagerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ManagerConfig =
            toml::from_str(s).map_err(|e| Error::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_write_interval_ms < MIN_WRITE_INTERVAL_FLOOR_MS {
            return Err(Error::Config(format!(
                "min_write_interval_ms must be at least {MIN_WRITE_INTERVAL_FLOOR_MS}"
            )));
        }
        if self.shutdown_timeout_ms == 0 {
            return Err(Error::Config("shutdown_timeout_ms must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn min_write_interval(&self) -> Duration {
        Duration::from_millis(self.min_write_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Queue bound, or `None` when unbounded.
    pub fn queue_capacity(&self) -> Option<usize> {
        (self.max_queue_len > 0).then_some(self.max_queue_len)
    }
}
