//! Tracing subscriber setup for the binary.

use crate::errors::{Result, SimError};
use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber filtered by `RUST_LOG`, falling back to `default_level`
pub fn init_tracing(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| SimError::Configuration(format!("invalid log filter: {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| SimError::Configuration(format!("failed to install subscriber: {e}")))
}
