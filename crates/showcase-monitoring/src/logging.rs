//! Structured logging using tracing.
//!
//! Output is either pretty for development or JSON lines for log
//! aggregation. `RUST_LOG` takes precedence over the configured filter.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, util::TryInitError, EnvFilter};

use crate::MonitoringConfig;

/// Build the filter from `RUST_LOG`, falling back to the configured one
pub fn env_filter(config: &MonitoringConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new(crate::DEFAULT_LOG_FILTER))
}

fn install(config: &MonitoringConfig) -> Result<(), TryInitError> {
    let subscriber = tracing_subscriber::registry().with(env_filter(config));

    if config.enable_json_logging {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    } else {
        subscriber
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    }
}

/// Initialize structured logging
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &MonitoringConfig) -> anyhow::Result<()> {
    install(config).context("Failed to set global default subscriber")?;

    info!(
        service_name = %config.service_name,
        log_format = if config.enable_json_logging { "json" } else { "pretty" },
        "Logging initialized"
    );

    Ok(())
}

/// Initialize logging unless a subscriber is already installed
///
/// Returns whether this call installed the subscriber.
pub fn try_init_logging(config: &MonitoringConfig) -> bool {
    install(config).is_ok()
}
