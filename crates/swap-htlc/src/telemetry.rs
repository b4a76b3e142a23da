//! # Telemetry
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` wins over the
//! configured level.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;
use crate::domain::SwapError;

/// Install a fmt subscriber, JSON formatted if configured.
///
/// Fails instead of panicking when a global subscriber already exists.
pub fn init_tracing(config: &LogConfig) -> Result<(), SwapError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| SwapError::InvalidConfig(format!("log level: {e}")))?;

    if config.json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| SwapError::InvalidConfig(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| SwapError::InvalidConfig(e.to_string()))?;
    }

    tracing::debug!(level = %config.level, json = config.json, "[swap] Tracing initialized");
    Ok(())
}
