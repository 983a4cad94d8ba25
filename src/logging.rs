//! Structured logging setup.

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Build the log filter. `RUST_LOG` wins over the configured level.
pub fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global tracing subscriber.
pub fn init(level: &str) -> Result<()> {
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter(level))
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global tracing subscriber")?;

    tracing::debug!("Logging initialized with level: {}", level);
    Ok(())
}
