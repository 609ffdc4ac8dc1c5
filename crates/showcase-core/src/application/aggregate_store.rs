use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::assembler::{assemble_flows, ResolvedReferences};
use crate::domain::flow::{Flow, FlowKind, NewFlow, NewStep, NewStepAction};
use crate::domain::ids::{FlowId, PersonaId, StepActionId, StepId};
use crate::domain::ordering::validate_flow;
use crate::domain::repository::{
    FlowPersonaRow, FlowRow, FlowRowSet, FlowStore, FlowStoreTransaction, StepActionRow, StepRow,
};
use crate::domain::resolver::EntityResolvers;
use crate::error::EntityKind;
use crate::CoreError;

/// Transactional store for the flow aggregate of one flow kind
///
/// Every mutation validates its payload and resolves all references before a
/// transaction is opened, so a rejected payload never leaves partial rows.
/// Storage errors raised inside the transaction roll it back and are returned
/// unchanged; nothing is retried.
pub struct FlowAggregateStore {
    /// Kind of flows this store reads and writes
    pub(crate) kind: FlowKind,

    /// Storage port
    pub(crate) store: Arc<dyn FlowStore>,

    /// Lookups for owners, assets and personas
    pub(crate) resolvers: EntityResolvers,
}

/// Rows to insert for one step payload
pub(crate) struct StepWrite {
    pub(crate) step: StepRow,
    pub(crate) actions: Vec<StepActionRow>,
}

impl FlowAggregateStore {
    /// Create a new aggregate store for flows of the given kind
    pub fn new(kind: FlowKind, store: Arc<dyn FlowStore>, resolvers: EntityResolvers) -> Self {
        Self {
            kind,
            store,
            resolvers,
        }
    }

    /// Aggregate store for issuance flows
    pub fn issuance(store: Arc<dyn FlowStore>, resolvers: EntityResolvers) -> Self {
        Self::new(FlowKind::Issuance, store, resolvers)
    }

    /// Aggregate store for presentation flows
    pub fn presentation(store: Arc<dyn FlowStore>, resolvers: EntityResolvers) -> Self {
        Self::new(FlowKind::Presentation, store, resolvers)
    }

    /// Kind of flows handled by this store
    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    /// Create a flow with its steps and actions in one transaction
    pub async fn create(&self, flow: NewFlow) -> Result<Flow, CoreError> {
        validate_flow(self.kind, &flow)?;
        let refs = self.resolvers.resolve_payload(self.kind, &flow).await?;

        let now = timestamp();
        let flow_row = FlowRow {
            id: FlowId::new(),
            kind: self.kind,
            name: flow.name,
            description: flow.description,
            owner_id: flow.owner_id,
            created_at: now,
            updated_at: now,
        };
        let persona_rows = self.persona_rows(&flow_row.id, &flow.persona_ids);
        let step_writes = plan_steps(&flow_row.id, &flow.steps);

        let mut tx = self.store.begin().await?;
        let result = async {
            tx.insert_flow(&flow_row).await?;
            if !persona_rows.is_empty() {
                tx.insert_flow_personas(&persona_rows).await?;
            }
            insert_steps(tx.as_mut(), &step_writes).await
        }
        .await;
        finish(tx, result).await?;

        info!(
            flow_id = %flow_row.id,
            flow_kind = %self.kind,
            steps = step_writes.len(),
            "Flow created"
        );

        assemble_one(flow_row, persona_rows, step_writes, &refs)
    }

    /// Replace a flow's fields, persona links and complete step set
    ///
    /// Children are replaced, not merged: every existing step and action of
    /// the flow is deleted and the payload's steps are inserted with freshly
    /// generated ids. Step and action ids from before the update are not
    /// preserved.
    pub async fn update(&self, id: &FlowId, flow: NewFlow) -> Result<Flow, CoreError> {
        let existing = self.require_flow(id).await?;
        validate_flow(self.kind, &flow)?;
        let refs = self.resolvers.resolve_payload(self.kind, &flow).await?;

        let flow_row = FlowRow {
            id: existing.id,
            kind: self.kind,
            name: flow.name,
            description: flow.description,
            owner_id: flow.owner_id,
            created_at: existing.created_at,
            updated_at: timestamp(),
        };
        let persona_rows = self.persona_rows(&flow_row.id, &flow.persona_ids);
        let step_writes = plan_steps(&flow_row.id, &flow.steps);

        let mut tx = self.store.begin().await?;
        let result = async {
            if tx.update_flow(&flow_row).await? == 0 {
                return Err(CoreError::not_found(EntityKind::Flow, flow_row.id));
            }
            if self.kind.requires_personas() {
                tx.delete_flow_personas(&flow_row.id).await?;
                tx.insert_flow_personas(&persona_rows).await?;
            }
            replace_children(tx.as_mut(), &flow_row.id, &step_writes).await
        }
        .await;
        finish(tx, result).await?;

        info!(
            flow_id = %flow_row.id,
            flow_kind = %self.kind,
            steps = step_writes.len(),
            "Flow updated"
        );

        assemble_one(flow_row, persona_rows, step_writes, &refs)
    }

    /// Delete a flow; its steps, actions and persona links go with it
    pub async fn delete(&self, id: &FlowId) -> Result<(), CoreError> {
        self.require_flow(id).await?;

        let mut tx = self.store.begin().await?;
        let result = async {
            if tx.delete_flow(self.kind, id).await? == 0 {
                return Err(CoreError::not_found(EntityKind::Flow, id));
            }
            Ok(())
        }
        .await;
        finish(tx, result).await?;

        info!(flow_id = %id, flow_kind = %self.kind, "Flow deleted");
        Ok(())
    }

    /// Find a flow by ID with its steps, owner and personas
    pub async fn find_by_id(&self, id: &FlowId) -> Result<Flow, CoreError> {
        let rows = self.store.select_flow_rows(self.kind, Some(id)).await?;
        if rows.flows.is_empty() {
            return Err(CoreError::not_found(EntityKind::Flow, id));
        }

        let refs = self.resolvers.resolve_rows(&rows).await?;
        assemble_flows(rows, &refs)?
            .pop()
            .ok_or_else(|| CoreError::not_found(EntityKind::Flow, id))
    }

    /// Find every flow of this store's kind
    pub async fn find_all(&self) -> Result<Vec<Flow>, CoreError> {
        let rows = self.store.select_flow_rows(self.kind, None).await?;
        debug!(flow_kind = %self.kind, flows = rows.flows.len(), "Loaded flow rows");

        let refs = self.resolvers.resolve_rows(&rows).await?;
        assemble_flows(rows, &refs)
    }

    /// Load the flow row or fail with NotFound
    pub(crate) async fn require_flow(&self, id: &FlowId) -> Result<FlowRow, CoreError> {
        self.store
            .select_flow(self.kind, id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityKind::Flow, id))
    }

    /// Load a step row under a flow of this kind or fail with NotFound
    pub(crate) async fn require_step(&self, flow_id: &FlowId, step_id: &StepId) -> Result<StepRow, CoreError> {
        self.require_flow(flow_id).await?;
        self.store
            .select_step(flow_id, step_id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityKind::Step, step_id))
    }

    fn persona_rows(&self, flow_id: &FlowId, persona_ids: &[PersonaId]) -> Vec<FlowPersonaRow> {
        if !self.kind.requires_personas() {
            return Vec::new();
        }
        persona_ids
            .iter()
            .map(|persona_id| FlowPersonaRow {
                flow_id: *flow_id,
                persona_id: *persona_id,
            })
            .collect()
    }
}

/// Current time at the microsecond precision storage keeps
fn timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Rows for a step payload, with fresh step and action ids
pub(crate) fn plan_step(flow_id: &FlowId, step: &NewStep) -> StepWrite {
    let row = StepRow {
        id: StepId::new(),
        flow_id: *flow_id,
        title: step.title.clone(),
        description: step.description.clone(),
        order: step.order,
        step_type: step.step_type,
        asset_id: step.asset_id,
    };
    let actions = action_rows(&row.id, &step.actions);
    StepWrite { step: row, actions }
}

/// Action rows for a step, with fresh ids
pub(crate) fn action_rows(step_id: &StepId, actions: &[NewStepAction]) -> Vec<StepActionRow> {
    actions
        .iter()
        .map(|action| action_row(StepActionId::new(), step_id, action))
        .collect()
}

pub(crate) fn action_row(id: StepActionId, step_id: &StepId, action: &NewStepAction) -> StepActionRow {
    StepActionRow {
        id,
        step_id: *step_id,
        title: action.title.clone(),
        action_type: action.action_type.clone(),
        text: action.text.clone(),
    }
}

fn plan_steps(flow_id: &FlowId, steps: &[NewStep]) -> Vec<StepWrite> {
    steps.iter().map(|step| plan_step(flow_id, step)).collect()
}

/// Insert steps, each followed by its actions
pub(crate) async fn insert_steps(
    tx: &mut dyn FlowStoreTransaction,
    writes: &[StepWrite],
) -> Result<(), CoreError> {
    for write in writes {
        tx.insert_step(&write.step).await?;
        tx.insert_actions(&write.actions).await?;
    }
    Ok(())
}

/// Replace-children strategy: drop every step of the flow, then insert the new set
async fn replace_children(
    tx: &mut dyn FlowStoreTransaction,
    flow_id: &FlowId,
    writes: &[StepWrite],
) -> Result<(), CoreError> {
    let removed = tx.delete_steps(flow_id).await?;
    debug!(flow_id = %flow_id, removed, inserted = writes.len(), "Replacing flow steps");
    insert_steps(tx, writes).await
}

/// Commit on success, roll back on failure and return the original error
pub(crate) async fn finish<T>(
    tx: Box<dyn FlowStoreTransaction>,
    result: Result<T, CoreError>,
) -> Result<T, CoreError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Failed to roll back transaction");
            }
            Err(err)
        }
    }
}

fn assemble_one(
    flow_row: FlowRow,
    persona_rows: Vec<FlowPersonaRow>,
    step_writes: Vec<StepWrite>,
    refs: &ResolvedReferences,
) -> Result<Flow, CoreError> {
    let flow_id = flow_row.id;
    let mut rows = FlowRowSet {
        flows: vec![flow_row],
        personas: persona_rows,
        ..Default::default()
    };
    for write in step_writes {
        rows.steps.push(write.step);
        rows.actions.extend(write.actions);
    }

    assemble_flows(rows, refs)?
        .pop()
        .ok_or_else(|| CoreError::not_found(EntityKind::Flow, flow_id))
}
