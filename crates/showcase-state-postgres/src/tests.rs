use crate::{PostgresConfig, PostgresConnection, PostgresStateStoreProvider};
use showcase_core::{
    CoreError, EntityKind, FlowAggregateStore, NewFlow, NewStep, NewStepAction, OwnerId, PersonaId,
    StepKind,
};
use std::time::Duration;
use uuid::Uuid;

#[test]
fn test_config_defaults() {
    let config = PostgresConfig::default();
    assert_eq!(config.max_connections, 5);
    assert_eq!(config.acquire_timeout_secs, 30);
    assert!(config.run_migrations);
}

#[test]
fn test_config_deserializes_partial_document() {
    let config: PostgresConfig = serde_json::from_value(serde_json::json!({
        "connection_string": "postgres://showcase@db/showcase",
        "run_migrations": false
    }))
    .unwrap();

    assert_eq!(config.connection_string, "postgres://showcase@db/showcase");
    assert!(!config.run_migrations);
    assert_eq!(config.max_connections, 5);
}

#[test]
fn test_config_from_env_keeps_defaults_for_invalid_values() {
    std::env::set_var("DATABASE_URL", "postgres://env@localhost/showcase");
    std::env::set_var("DATABASE_MAX_CONNECTIONS", "many");
    std::env::set_var("DATABASE_ACQUIRE_TIMEOUT_SECS", "7");
    std::env::set_var("DATABASE_RUN_MIGRATIONS", "no");

    let config = PostgresConfig::from_env();

    std::env::remove_var("DATABASE_URL");
    std::env::remove_var("DATABASE_MAX_CONNECTIONS");
    std::env::remove_var("DATABASE_ACQUIRE_TIMEOUT_SECS");
    std::env::remove_var("DATABASE_RUN_MIGRATIONS");

    assert_eq!(config.connection_string, "postgres://env@localhost/showcase");
    assert_eq!(config.max_connections, 5);
    assert_eq!(config.acquire_timeout_secs, 7);
    assert!(!config.run_migrations);
}

/// Connect to the database named by SHOWCASE_TEST_DATABASE_URL and migrate it
async fn test_provider() -> PostgresStateStoreProvider {
    let url = std::env::var("SHOWCASE_TEST_DATABASE_URL")
        .expect("SHOWCASE_TEST_DATABASE_URL must be set for database tests");
    PostgresStateStoreProvider::with_config(PostgresConfig {
        connection_string: url,
        max_connections: 2,
        acquire_timeout_secs: 5,
        run_migrations: true,
    })
    .await
    .expect("Failed to connect to test database")
}

struct Seeded {
    issuer: OwnerId,
    persona: PersonaId,
}

async fn seed(conn: &PostgresConnection) -> Seeded {
    let issuer = Uuid::new_v4();
    let persona = Uuid::new_v4();

    sqlx::query("INSERT INTO owners (id, kind, name, description) VALUES ($1, 'ISSUER', 'Best BC College', 'Issues student cards')")
        .bind(issuer)
        .execute(conn.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO personas (id, name, role) VALUES ($1, 'Ana', 'Student')")
        .bind(persona)
        .execute(conn.pool())
        .await
        .unwrap();

    Seeded {
        issuer: issuer.into(),
        persona: persona.into(),
    }
}

fn payload(seeded: &Seeded, orders: &[i32]) -> NewFlow {
    NewFlow {
        name: "Student card".to_string(),
        description: "Get your student card".to_string(),
        owner_id: seeded.issuer,
        persona_ids: vec![seeded.persona],
        steps: orders
            .iter()
            .map(|order| NewStep {
                title: format!("Step {}", order),
                description: None,
                order: *order,
                step_type: StepKind::HumanTask,
                asset_id: None,
                actions: vec![NewStepAction {
                    title: "Next".to_string(),
                    action_type: "BUTTON".to_string(),
                    text: "Continue".to_string(),
                }],
            })
            .collect(),
    }
}

fn issuance_store(provider: &PostgresStateStoreProvider) -> FlowAggregateStore {
    provider.create_repositories().0
}

#[tokio::test]
#[ignore = "requires SHOWCASE_TEST_DATABASE_URL"]
async fn test_flow_lifecycle_against_database() {
    let provider = test_provider().await;
    let seeded = seed(provider.connection()).await;
    let store = issuance_store(&provider);

    let created = store.create(payload(&seeded, &[2, 1])).await.unwrap();
    let found = store.find_by_id(&created.id).await.unwrap();
    assert_eq!(found, created);
    assert_eq!(found.steps.iter().map(|s| s.order).collect::<Vec<_>>(), vec![1, 2]);

    let updated = store.update(&created.id, payload(&seeded, &[1])).await.unwrap();
    assert_eq!(updated.steps.len(), 1);
    assert_ne!(updated.steps[0].id, created.steps[0].id);
    assert_eq!(updated.created_at, created.created_at);

    store.delete(&created.id).await.unwrap();
    assert_eq!(
        store.find_by_id(&created.id).await.unwrap_err(),
        CoreError::not_found(EntityKind::Flow, created.id)
    );
}

#[tokio::test]
#[ignore = "requires SHOWCASE_TEST_DATABASE_URL"]
async fn test_duplicate_order_reports_database_constraint() {
    let provider = test_provider().await;
    let seeded = seed(provider.connection()).await;
    let store = issuance_store(&provider);
    let before = store.find_all().await.unwrap().len();

    let err = store.create(payload(&seeded, &[1, 1])).await.unwrap_err();

    match err {
        CoreError::ConstraintViolation { constraint, message } => {
            assert_eq!(constraint, "steps_flow_id_order_key");
            assert!(message.contains("steps_flow_id_order_key"));
        }
        other => panic!("expected constraint violation, got {:?}", other),
    }
    assert_eq!(store.find_all().await.unwrap().len(), before);
}

#[tokio::test]
#[ignore = "requires SHOWCASE_TEST_DATABASE_URL"]
async fn test_migrations_are_idempotent() {
    let provider = test_provider().await;
    provider.connection().run_migrations().await.unwrap();

    let conn = PostgresConnection::new(
        &std::env::var("SHOWCASE_TEST_DATABASE_URL").unwrap(),
        1,
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    conn.run_migrations().await.unwrap();
}

#[tokio::test]
#[ignore = "requires SHOWCASE_TEST_DATABASE_URL"]
async fn test_reads_never_see_a_half_replaced_flow() {
    let provider = test_provider().await;
    let seeded = seed(provider.connection()).await;
    let writer = issuance_store(&provider);
    let reader = issuance_store(&provider);

    let created = writer.create(payload(&seeded, &[1, 2, 3])).await.unwrap();
    let flow_id = created.id;

    let write = async {
        for round in 0..20 {
            let orders: &[i32] = if round % 2 == 0 { &[4, 5] } else { &[1, 2, 3] };
            writer.update(&flow_id, payload(&seeded, orders)).await.unwrap();
        }
        writer.delete(&flow_id).await.unwrap();
    };

    let read = async {
        for _ in 0..1000 {
            match reader.find_by_id(&flow_id).await {
                Ok(flow) => {
                    let orders: Vec<i32> = flow.steps.iter().map(|s| s.order).collect();
                    assert!(
                        orders == vec![1, 2, 3] || orders == vec![4, 5],
                        "torn step set: {:?}",
                        orders
                    );
                    assert_eq!(flow.personas.len(), 1);
                    assert!(flow.steps.iter().all(|s| s.actions.len() == 1));
                }
                Err(err) => {
                    assert_eq!(err, CoreError::not_found(EntityKind::Flow, flow_id));
                    break;
                }
            }
        }
    };

    tokio::join!(write, read);
}
