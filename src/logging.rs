//! Logging setup for host applications.
//!
//! The library only emits `tracing` events. Applications that do not install their
//! own subscriber can call [`setup_logging`]; `RUST_LOG` overrides the default level.
//! Per-report traffic is logged at `debug` and only when
//! [`ManagerConfig::debug_messages`](crate::config::ManagerConfig::debug_messages) is on.

use crate::error::{Error, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a formatted `tracing` subscriber filtered at `default_level`
/// (e.g. `"info"` or `"motelink=debug"`).
pub fn setup_logging(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| Error::Config(format!("invalid log filter: {e}")))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialised: {e}")))
}
