use crate::{InMemoryEntityDirectory, InMemoryFlowStore, InMemoryStateStoreProvider, STEP_ORDER_CONSTRAINT};
use chrono::Utc;
use showcase_core::{
    CoreError, EntityKind, FlowId, FlowKind, FlowPersonaRow, FlowRow, FlowStore, NewFlow, NewStep,
    NewStepAction, Owner, OwnerId, OwnerKind, OwnerResolver, PersonaId, StepActionId,
    StepActionRow, StepId, StepKind, StepRow,
};

fn flow_row(kind: FlowKind) -> FlowRow {
    FlowRow {
        id: FlowId::new(),
        kind,
        name: "Student card".to_string(),
        description: "Get your student card".to_string(),
        owner_id: OwnerId::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn step_row(flow_id: FlowId, order: i32) -> StepRow {
    StepRow {
        id: StepId::new(),
        flow_id,
        title: format!("Step {}", order),
        description: None,
        order,
        step_type: StepKind::HumanTask,
        asset_id: None,
    }
}

fn action_row(step_id: StepId) -> StepActionRow {
    StepActionRow {
        id: StepActionId::new(),
        step_id,
        title: "Next".to_string(),
        action_type: "BUTTON".to_string(),
        text: "Continue".to_string(),
    }
}

#[tokio::test]
async fn test_committed_writes_are_visible() -> Result<(), CoreError> {
    let store = InMemoryFlowStore::default();
    let flow = flow_row(FlowKind::Issuance);
    let step = step_row(flow.id, 1);

    let mut tx = store.begin().await?;
    tx.insert_flow(&flow).await?;
    tx.insert_step(&step).await?;
    tx.insert_actions(&[action_row(step.id), action_row(step.id)]).await?;
    tx.commit().await?;

    let rows = store.select_flow_rows(FlowKind::Issuance, Some(&flow.id)).await?;
    assert_eq!(rows.flows, vec![flow.clone()]);
    assert_eq!(rows.steps, vec![step.clone()]);
    assert_eq!(rows.actions.len(), 2);

    // Other kind does not see it
    assert!(store.select_flow(FlowKind::Presentation, &flow.id).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_dropped_transaction_discards_writes() -> Result<(), CoreError> {
    let store = InMemoryFlowStore::default();
    let flow = flow_row(FlowKind::Issuance);

    {
        let mut tx = store.begin().await?;
        tx.insert_flow(&flow).await?;
    }

    assert!(store.select_flow(FlowKind::Issuance, &flow.id).await?.is_none());

    let mut tx = store.begin().await?;
    tx.insert_flow(&flow).await?;
    tx.rollback().await?;

    assert_eq!(store.snapshot().await.row_counts(), (0, 0, 0));

    Ok(())
}

#[tokio::test]
async fn test_duplicate_step_order_violates_unique_constraint() -> Result<(), CoreError> {
    let store = InMemoryFlowStore::default();
    let flow = flow_row(FlowKind::Issuance);

    let mut tx = store.begin().await?;
    tx.insert_flow(&flow).await?;
    tx.insert_step(&step_row(flow.id, 1)).await?;
    let err = tx.insert_step(&step_row(flow.id, 1)).await.unwrap_err();

    assert_eq!(
        err,
        CoreError::ConstraintViolation {
            constraint: STEP_ORDER_CONSTRAINT.to_string(),
            message: "duplicate key value violates unique constraint \"steps_flow_id_order_key\"".to_string(),
        }
    );

    // Same order in another flow is fine
    let other = flow_row(FlowKind::Issuance);
    tx.insert_flow(&other).await?;
    tx.insert_step(&step_row(other.id, 1)).await?;

    Ok(())
}

#[tokio::test]
async fn test_child_rows_require_parent() -> Result<(), CoreError> {
    let store = InMemoryFlowStore::default();
    let mut tx = store.begin().await?;

    let err = tx.insert_step(&step_row(FlowId::new(), 1)).await.unwrap_err();
    assert!(err.is_constraint_violation());

    let err = tx.insert_actions(&[action_row(StepId::new())]).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::ConstraintViolation { ref constraint, .. } if constraint == "step_actions_step_id_fkey"
    ));

    Ok(())
}

#[tokio::test]
async fn test_delete_flow_cascades() -> Result<(), CoreError> {
    let store = InMemoryFlowStore::default();
    let flow = flow_row(FlowKind::Issuance);
    let kept = flow_row(FlowKind::Issuance);
    let step = step_row(flow.id, 1);
    let kept_step = step_row(kept.id, 1);

    let mut tx = store.begin().await?;
    tx.insert_flow(&flow).await?;
    tx.insert_flow(&kept).await?;
    tx.insert_flow_personas(&[FlowPersonaRow {
        flow_id: flow.id,
        persona_id: PersonaId::new(),
    }])
    .await?;
    tx.insert_step(&step).await?;
    tx.insert_step(&kept_step).await?;
    tx.insert_actions(&[action_row(step.id), action_row(kept_step.id)]).await?;
    tx.commit().await?;

    let mut tx = store.begin().await?;
    assert_eq!(tx.delete_flow(FlowKind::Presentation, &flow.id).await?, 0);
    assert_eq!(tx.delete_flow(FlowKind::Issuance, &flow.id).await?, 1);
    tx.commit().await?;

    assert_eq!(store.snapshot().await.row_counts(), (1, 1, 1));
    let rows = store.select_flow_rows(FlowKind::Issuance, None).await?;
    assert!(rows.personas.is_empty());
    assert_eq!(rows.steps, vec![kept_step]);

    Ok(())
}

#[tokio::test]
async fn test_update_and_delete_report_affected_rows() -> Result<(), CoreError> {
    let store = InMemoryFlowStore::default();
    let flow = flow_row(FlowKind::Presentation);
    let step = step_row(flow.id, 1);
    let action = action_row(step.id);

    let mut tx = store.begin().await?;
    tx.insert_flow(&flow).await?;
    tx.insert_step(&step).await?;
    tx.insert_actions(std::slice::from_ref(&action)).await?;

    let mut renamed = action.clone();
    renamed.text = "Accept".to_string();
    assert_eq!(tx.update_action(&renamed).await?, 1);
    assert_eq!(tx.update_action(&action_row(step.id)).await?, 0);
    assert_eq!(tx.update_step(&step_row(flow.id, 2)).await?, 0);
    assert_eq!(tx.delete_step(&FlowId::new(), &step.id).await?, 0);
    assert_eq!(tx.delete_action(&step.id, &action.id).await?, 1);
    tx.commit().await?;

    assert!(store.select_actions(&step.id, None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_directory_checks_owner_kind() {
    let directory = InMemoryEntityDirectory::new();
    let owner = Owner {
        id: OwnerId::new(),
        kind: OwnerKind::Issuer,
        name: "Best BC College".to_string(),
        description: "Issues student cards".to_string(),
        organization: None,
        logo: None,
        credential_definitions: vec![],
    };
    directory.insert_owner(owner.clone()).await;

    assert_eq!(
        directory.find_by_id(OwnerKind::Issuer, &owner.id).await,
        Ok(owner.clone())
    );
    assert_eq!(
        directory.find_by_id(OwnerKind::RelyingParty, &owner.id).await,
        Err(CoreError::not_found(EntityKind::RelyingParty, owner.id))
    );
}

#[tokio::test]
async fn test_provider_wires_both_flow_kinds() -> Result<(), CoreError> {
    let provider = InMemoryStateStoreProvider::new();
    let directory = provider.directory();
    let relying_party = Owner {
        id: OwnerId::new(),
        kind: OwnerKind::RelyingParty,
        name: "Cool Clothes Online".to_string(),
        description: "Student discounts".to_string(),
        organization: None,
        logo: None,
        credential_definitions: vec![],
    };
    directory.insert_owner(relying_party.clone()).await;

    let (issuance, presentation) = provider.create_repositories();
    assert_eq!(issuance.kind(), FlowKind::Issuance);

    let created = presentation
        .create(NewFlow {
            name: "Discount".to_string(),
            description: "Prove you are a student".to_string(),
            owner_id: relying_party.id,
            persona_ids: vec![],
            steps: vec![NewStep {
                title: "Connect".to_string(),
                description: None,
                order: 1,
                step_type: StepKind::Service,
                asset_id: None,
                actions: vec![NewStepAction {
                    title: "Share".to_string(),
                    action_type: "ARIES_OOB".to_string(),
                    text: "Scan the QR code".to_string(),
                }],
            }],
        })
        .await?;

    assert_eq!(created.owner, relying_party);
    assert_eq!(presentation.find_all().await?.len(), 1);
    assert!(issuance.find_all().await?.is_empty());
    assert_eq!(
        issuance.find_by_id(&created.id).await.unwrap_err(),
        CoreError::not_found(EntityKind::Flow, created.id)
    );

    Ok(())
}
