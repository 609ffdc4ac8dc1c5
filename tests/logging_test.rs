//! Logging initialization alongside store operations

use showcase_monitoring::{try_init_logging, MonitoringConfig};
use showcase_test_utils::{test_monitoring_config, ShowcaseFixture};

#[tokio::test]
async fn test_operations_log_through_installed_subscriber() -> anyhow::Result<()> {
    let config = MonitoringConfig {
        enable_json_logging: true,
        ..test_monitoring_config()
    };
    let _ = try_init_logging(&config);

    let fixture = ShowcaseFixture::new().await;
    let flow = fixture.issuance.create(fixture.issuance_payload(&[1])).await?;
    tracing::info!(flow_id = %flow.id, "Created flow under test subscriber");
    fixture.issuance.delete(&flow.id).await?;

    // A second installation attempt is tolerated
    assert!(!try_init_logging(&config));

    Ok(())
}
