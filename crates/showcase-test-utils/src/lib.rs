//! Testing utilities for showcase flow persistence.
//!
//! This crate provides payload builders, entity factories and a seeded
//! in-memory fixture shared by the workspace tests.

pub mod builders;
pub mod fixtures;

pub use builders::{action, NewFlowBuilder, NewStepBuilder};
pub use fixtures::{asset, issuer, persona, relying_party, ShowcaseFixture};

use showcase_monitoring::{MonitoringConfig, DEFAULT_LOG_FILTER};

/// Install a test-friendly subscriber once per test binary
///
/// Output goes through the test writer so it is captured per test.
pub fn init_test_logging() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// Logging configuration used by tests that exercise monitoring setup
pub fn test_monitoring_config() -> MonitoringConfig {
    MonitoringConfig {
        service_name: "showcase-tests".to_string(),
        ..Default::default()
    }
}
