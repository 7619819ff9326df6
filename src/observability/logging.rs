//! # Logging
//!
//! `tracing` subscriber setup driven by [`ProviderConfig`].
//!
//! `RUST_LOG` wins when set; otherwise `LOG_LEVEL` applies to this crate.
//! `LOG_FORMAT=json` switches to structured JSON lines on stderr.

use crate::config::ProviderConfig;
use anyhow::{Context, Result};
use std::io;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter directive for a configured log level
#[must_use]
pub fn default_directive(log_level: &str) -> String {
    let level = match log_level.trim().to_uppercase().as_str() {
        "ERROR" => "error",
        "WARN" | "WARNING" => "warn",
        "DEBUG" => "debug",
        "TRACE" => "trace",
        _ => "info",
    };
    format!("tsi_environment_provider={level},tsi_env={level}")
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already installed.
pub fn init_tracing(config: &ProviderConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(&config.log_level)))
        .context("Failed to create tracing filter")?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.log_format.eq_ignore_ascii_case("json") {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_span_list(true);
        registry
            .with(layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(true);
        registry
            .with(layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;
    }

    Ok(())
}
