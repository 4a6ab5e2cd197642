//! Log setup for the command-line tool
//!
//! Logs go to stderr so that report output on stdout stays machine readable.

use lockstep_core::{LockstepConfig, LogFormat};
use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset: the configured level for our crates,
/// warnings for everything else
pub fn default_filter(level: &str) -> String {
    format!("warn,lockstep={level},lockstep_core={level},lockstep_migrate={level}")
}

/// Initialize logging. `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LockstepConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(&config.log_level)))?;

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).json())
            .try_init()?,
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).with_target(false))
            .try_init()?,
    }

    tracing::debug!("Logging initialized at {} ({})", config.log_level, config.log_format);
    Ok(())
}
