//! Storage port for the flow aggregate
//!
//! The aggregate store talks to storage only through these traits and the
//! flat row types below. Implementations enforce the persisted layout:
//! - `steps (flow_id, "order")` is unique; a duplicate fails with
//!   [`CoreError::ConstraintViolation`] and is never pre-checked here.
//! - Steps and flow persona links reference their flow, actions reference
//!   their step; deleting a parent cascades to its children.
//!
//! Writes happen only through a [`FlowStoreTransaction`]. Dropping a
//! transaction without calling `commit` discards its writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::flow::{FlowKind, StepKind};
use super::ids::{AssetId, FlowId, OwnerId, PersonaId, StepActionId, StepId};
use crate::CoreError;

/// Row of the `flows` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRow {
    pub id: FlowId,
    pub kind: FlowKind,
    pub name: String,
    pub description: String,
    pub owner_id: OwnerId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row of the `flow_personas` link table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowPersonaRow {
    pub flow_id: FlowId,
    pub persona_id: PersonaId,
}

/// Row of the `steps` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRow {
    pub id: StepId,
    pub flow_id: FlowId,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
    pub step_type: StepKind,
    pub asset_id: Option<AssetId>,
}

/// Row of the `step_actions` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepActionRow {
    pub id: StepActionId,
    pub step_id: StepId,
    pub title: String,
    pub action_type: String,
    pub text: String,
}

/// Flat result of a flow query joined with its children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowRowSet {
    /// Flows in creation order
    pub flows: Vec<FlowRow>,
    /// Persona links of those flows, in link order
    pub personas: Vec<FlowPersonaRow>,
    /// Steps of those flows, in no particular order
    pub steps: Vec<StepRow>,
    /// Actions of those steps, in insertion order
    pub actions: Vec<StepActionRow>,
}

/// Flat result of a step query joined with its actions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepRowSet {
    pub steps: Vec<StepRow>,
    pub actions: Vec<StepActionRow>,
}

/// Read side of the storage port, plus the transaction entry point
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Open a write transaction
    async fn begin(&self) -> Result<Box<dyn FlowStoreTransaction>, CoreError>;

    /// Find a single flow row of the given kind
    async fn select_flow(&self, kind: FlowKind, id: &FlowId) -> Result<Option<FlowRow>, CoreError>;

    /// Flows of the given kind with persona links, steps and actions.
    /// `id` narrows the result to one flow.
    async fn select_flow_rows(
        &self,
        kind: FlowKind,
        id: Option<&FlowId>,
    ) -> Result<FlowRowSet, CoreError>;

    /// Find a step row under the given flow
    async fn select_step(&self, flow_id: &FlowId, step_id: &StepId) -> Result<Option<StepRow>, CoreError>;

    /// Steps of a flow with their actions. `step_id` narrows the result to one step.
    async fn select_step_rows(
        &self,
        flow_id: &FlowId,
        step_id: Option<&StepId>,
    ) -> Result<StepRowSet, CoreError>;

    /// Actions of a step in insertion order. `action_id` narrows the result to one action.
    async fn select_actions(
        &self,
        step_id: &StepId,
        action_id: Option<&StepActionId>,
    ) -> Result<Vec<StepActionRow>, CoreError>;
}

/// Write side of the storage port
///
/// Mutations that target a single row by key return the number of rows
/// affected so callers can report missing rows.
#[async_trait]
pub trait FlowStoreTransaction: Send {
    /// Insert a flow row
    async fn insert_flow(&mut self, row: &FlowRow) -> Result<(), CoreError>;

    /// Update name, description, owner and `updated_at` of a flow of the row's kind
    async fn update_flow(&mut self, row: &FlowRow) -> Result<u64, CoreError>;

    /// Delete a flow of the given kind, cascading to its children
    async fn delete_flow(&mut self, kind: FlowKind, id: &FlowId) -> Result<u64, CoreError>;

    /// Insert persona links
    async fn insert_flow_personas(&mut self, rows: &[FlowPersonaRow]) -> Result<(), CoreError>;

    /// Delete every persona link of a flow
    async fn delete_flow_personas(&mut self, flow_id: &FlowId) -> Result<u64, CoreError>;

    /// Insert a step row
    async fn insert_step(&mut self, row: &StepRow) -> Result<(), CoreError>;

    /// Update the scalar fields of a step under the row's flow
    async fn update_step(&mut self, row: &StepRow) -> Result<u64, CoreError>;

    /// Delete one step under a flow, cascading to its actions
    async fn delete_step(&mut self, flow_id: &FlowId, step_id: &StepId) -> Result<u64, CoreError>;

    /// Delete every step of a flow, cascading to their actions
    async fn delete_steps(&mut self, flow_id: &FlowId) -> Result<u64, CoreError>;

    /// Insert action rows
    async fn insert_actions(&mut self, rows: &[StepActionRow]) -> Result<(), CoreError>;

    /// Update an action under the row's step
    async fn update_action(&mut self, row: &StepActionRow) -> Result<u64, CoreError>;

    /// Delete one action under a step
    async fn delete_action(&mut self, step_id: &StepId, action_id: &StepActionId) -> Result<u64, CoreError>;

    /// Delete every action of a step
    async fn delete_actions(&mut self, step_id: &StepId) -> Result<u64, CoreError>;

    /// Make all writes of this transaction visible
    async fn commit(self: Box<Self>) -> Result<(), CoreError>;

    /// Discard all writes of this transaction
    async fn rollback(self: Box<Self>) -> Result<(), CoreError>;
}
