//! Logging setup for showcase services and tests.

use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

pub mod logging;

pub use logging::{init_logging, try_init_logging};

/// Default filter when neither `RUST_LOG` nor `LOG_FILTER` is set
pub const DEFAULT_LOG_FILTER: &str = "info,showcase=debug";

/// Configuration for initializing logging
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter (e.g., "info,showcase=debug")
    pub log_filter: String,
    /// Emit JSON lines instead of pretty output
    pub enable_json_logging: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "showcase".to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            enable_json_logging: false,
        }
    }
}

impl MonitoringConfig {
    /// Load configuration from `LOG_FILTER` and `LOG_FORMAT`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(filter) = env::var("LOG_FILTER") {
            config.log_filter = filter;
        }

        if let Ok(format) = env::var("LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "json" => config.enable_json_logging = true,
                "pretty" | "text" => config.enable_json_logging = false,
                _ => warn!("Invalid LOG_FORMAT value: {}", format),
            }
        }

        config
    }
}

/// Initialize logging for a service
pub fn init(config: MonitoringConfig) -> anyhow::Result<()> {
    init_logging(&config)?;
    info!(service_name = %config.service_name, "Monitoring initialized");
    Ok(())
}
