use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

use showcase_core::{
    Asset, AssetId, AssetResolver, CoreError, EntityKind, FlowId, FlowKind, FlowPersonaRow,
    FlowRow, FlowRowSet, FlowStore, FlowStoreTransaction, Owner, OwnerId, OwnerKind,
    OwnerResolver, Persona, PersonaId, PersonaResolver, StepActionId, StepActionRow, StepId,
    StepRow, StepRowSet,
};

/// Unique constraint on the position of a step within its flow
pub const STEP_ORDER_CONSTRAINT: &str = "steps_flow_id_order_key";

/// Tables of the flow aggregate, in insertion order
#[derive(Debug, Clone, Default)]
pub struct FlowTables {
    flows: IndexMap<FlowId, FlowRow>,
    flow_personas: Vec<FlowPersonaRow>,
    steps: IndexMap<StepId, StepRow>,
    actions: IndexMap<StepActionId, StepActionRow>,
}

fn unique_violation(constraint: &str) -> CoreError {
    CoreError::ConstraintViolation {
        constraint: constraint.to_string(),
        message: format!("duplicate key value violates unique constraint \"{}\"", constraint),
    }
}

fn foreign_key_violation(table: &str, constraint: &str) -> CoreError {
    CoreError::ConstraintViolation {
        constraint: constraint.to_string(),
        message: format!(
            "insert or update on table \"{}\" violates foreign key constraint \"{}\"",
            table, constraint
        ),
    }
}

impl FlowTables {
    /// Number of flows, steps and actions currently stored
    pub fn row_counts(&self) -> (usize, usize, usize) {
        (self.flows.len(), self.steps.len(), self.actions.len())
    }

    fn flow(&self, kind: FlowKind, id: &FlowId) -> Option<&FlowRow> {
        self.flows.get(id).filter(|flow| flow.kind == kind)
    }

    fn check_step_order(&self, row: &StepRow) -> Result<(), CoreError> {
        let taken = self
            .steps
            .values()
            .any(|step| step.flow_id == row.flow_id && step.order == row.order && step.id != row.id);
        if taken {
            return Err(unique_violation(STEP_ORDER_CONSTRAINT));
        }
        Ok(())
    }

    fn insert_flow(&mut self, row: &FlowRow) -> Result<(), CoreError> {
        if self.flows.contains_key(&row.id) {
            return Err(unique_violation("flows_pkey"));
        }
        self.flows.insert(row.id, row.clone());
        Ok(())
    }

    fn update_flow(&mut self, row: &FlowRow) -> u64 {
        match self.flows.get_mut(&row.id).filter(|flow| flow.kind == row.kind) {
            Some(flow) => {
                flow.name = row.name.clone();
                flow.description = row.description.clone();
                flow.owner_id = row.owner_id;
                flow.updated_at = row.updated_at;
                1
            }
            None => 0,
        }
    }

    fn delete_flow(&mut self, kind: FlowKind, id: &FlowId) -> u64 {
        if self.flow(kind, id).is_none() {
            return 0;
        }
        self.delete_flow_personas(id);
        self.delete_steps(id);
        self.flows.shift_remove(id);
        1
    }

    fn insert_flow_personas(&mut self, rows: &[FlowPersonaRow]) -> Result<(), CoreError> {
        for row in rows {
            if !self.flows.contains_key(&row.flow_id) {
                return Err(foreign_key_violation("flow_personas", "flow_personas_flow_id_fkey"));
            }
            if self.flow_personas.contains(row) {
                return Err(unique_violation("flow_personas_pkey"));
            }
            self.flow_personas.push(row.clone());
        }
        Ok(())
    }

    fn delete_flow_personas(&mut self, flow_id: &FlowId) -> u64 {
        let before = self.flow_personas.len();
        self.flow_personas.retain(|link| link.flow_id != *flow_id);
        (before - self.flow_personas.len()) as u64
    }

    fn insert_step(&mut self, row: &StepRow) -> Result<(), CoreError> {
        if self.steps.contains_key(&row.id) {
            return Err(unique_violation("steps_pkey"));
        }
        if !self.flows.contains_key(&row.flow_id) {
            return Err(foreign_key_violation("steps", "steps_flow_id_fkey"));
        }
        self.check_step_order(row)?;
        self.steps.insert(row.id, row.clone());
        Ok(())
    }

    fn update_step(&mut self, row: &StepRow) -> Result<u64, CoreError> {
        let exists = self
            .steps
            .get(&row.id)
            .is_some_and(|step| step.flow_id == row.flow_id);
        if !exists {
            return Ok(0);
        }
        self.check_step_order(row)?;
        self.steps.insert(row.id, row.clone());
        Ok(1)
    }

    fn delete_step(&mut self, flow_id: &FlowId, step_id: &StepId) -> u64 {
        let exists = self
            .steps
            .get(step_id)
            .is_some_and(|step| step.flow_id == *flow_id);
        if !exists {
            return 0;
        }
        self.delete_actions(step_id);
        self.steps.shift_remove(step_id);
        1
    }

    fn delete_steps(&mut self, flow_id: &FlowId) -> u64 {
        let doomed: HashSet<StepId> = self
            .steps
            .values()
            .filter(|step| step.flow_id == *flow_id)
            .map(|step| step.id)
            .collect();
        self.actions.retain(|_, action| !doomed.contains(&action.step_id));
        self.steps.retain(|id, _| !doomed.contains(id));
        doomed.len() as u64
    }

    fn insert_actions(&mut self, rows: &[StepActionRow]) -> Result<(), CoreError> {
        for row in rows {
            if self.actions.contains_key(&row.id) {
                return Err(unique_violation("step_actions_pkey"));
            }
            if !self.steps.contains_key(&row.step_id) {
                return Err(foreign_key_violation("step_actions", "step_actions_step_id_fkey"));
            }
            self.actions.insert(row.id, row.clone());
        }
        Ok(())
    }

    fn update_action(&mut self, row: &StepActionRow) -> u64 {
        match self
            .actions
            .get_mut(&row.id)
            .filter(|action| action.step_id == row.step_id)
        {
            Some(action) => {
                *action = row.clone();
                1
            }
            None => 0,
        }
    }

    fn delete_action(&mut self, step_id: &StepId, action_id: &StepActionId) -> u64 {
        let exists = self
            .actions
            .get(action_id)
            .is_some_and(|action| action.step_id == *step_id);
        if !exists {
            return 0;
        }
        self.actions.shift_remove(action_id);
        1
    }

    fn delete_actions(&mut self, step_id: &StepId) -> u64 {
        let before = self.actions.len();
        self.actions.retain(|_, action| action.step_id != *step_id);
        (before - self.actions.len()) as u64
    }

    fn actions_of<'a>(&'a self, step_ids: &'a HashSet<StepId>) -> impl Iterator<Item = StepActionRow> + 'a {
        self.actions
            .values()
            .filter(move |action| step_ids.contains(&action.step_id))
            .cloned()
    }
}

/// In-memory implementation of the flow storage port
///
/// Write transactions hold the table lock until they finish, so they run
/// one at a time. Reads wait for an open transaction to finish.
pub struct InMemoryFlowStore {
    tables: Arc<RwLock<FlowTables>>,
}

impl InMemoryFlowStore {
    /// Create a new in-memory flow store over shared tables
    pub fn new(tables: Arc<RwLock<FlowTables>>) -> Self {
        Self { tables }
    }

    /// Copy of the current committed tables
    pub async fn snapshot(&self) -> FlowTables {
        self.tables.read().await.clone()
    }
}

impl Default for InMemoryFlowStore {
    fn default() -> Self {
        Self::new(Arc::new(RwLock::new(FlowTables::default())))
    }
}

#[async_trait]
impl FlowStore for InMemoryFlowStore {
    async fn begin(&self) -> Result<Box<dyn FlowStoreTransaction>, CoreError> {
        let live = self.tables.clone().write_owned().await;
        let staged = live.clone();
        debug!("In-memory transaction started");
        Ok(Box::new(InMemoryFlowTransaction { live, staged }))
    }

    async fn select_flow(&self, kind: FlowKind, id: &FlowId) -> Result<Option<FlowRow>, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables.flow(kind, id).cloned())
    }

    async fn select_flow_rows(
        &self,
        kind: FlowKind,
        id: Option<&FlowId>,
    ) -> Result<FlowRowSet, CoreError> {
        let tables = self.tables.read().await;

        let flows: Vec<FlowRow> = tables
            .flows
            .values()
            .filter(|flow| flow.kind == kind && id.map_or(true, |id| flow.id == *id))
            .cloned()
            .collect();
        let flow_ids: HashSet<FlowId> = flows.iter().map(|flow| flow.id).collect();

        let personas = tables
            .flow_personas
            .iter()
            .filter(|link| flow_ids.contains(&link.flow_id))
            .cloned()
            .collect();
        let steps: Vec<StepRow> = tables
            .steps
            .values()
            .filter(|step| flow_ids.contains(&step.flow_id))
            .cloned()
            .collect();
        let step_ids: HashSet<StepId> = steps.iter().map(|step| step.id).collect();
        let actions = tables.actions_of(&step_ids).collect();

        Ok(FlowRowSet {
            flows,
            personas,
            steps,
            actions,
        })
    }

    async fn select_step(&self, flow_id: &FlowId, step_id: &StepId) -> Result<Option<StepRow>, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .steps
            .get(step_id)
            .filter(|step| step.flow_id == *flow_id)
            .cloned())
    }

    async fn select_step_rows(
        &self,
        flow_id: &FlowId,
        step_id: Option<&StepId>,
    ) -> Result<StepRowSet, CoreError> {
        let tables = self.tables.read().await;

        let steps: Vec<StepRow> = tables
            .steps
            .values()
            .filter(|step| step.flow_id == *flow_id && step_id.map_or(true, |id| step.id == *id))
            .cloned()
            .collect();
        let step_ids: HashSet<StepId> = steps.iter().map(|step| step.id).collect();
        let actions = tables.actions_of(&step_ids).collect();

        Ok(StepRowSet { steps, actions })
    }

    async fn select_actions(
        &self,
        step_id: &StepId,
        action_id: Option<&StepActionId>,
    ) -> Result<Vec<StepActionRow>, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .actions
            .values()
            .filter(|action| action.step_id == *step_id && action_id.map_or(true, |id| action.id == *id))
            .cloned()
            .collect())
    }
}

/// Write transaction over a staged copy of the tables
///
/// Dropping the transaction without committing discards the staged copy.
pub struct InMemoryFlowTransaction {
    live: OwnedRwLockWriteGuard<FlowTables>,
    staged: FlowTables,
}

#[async_trait]
impl FlowStoreTransaction for InMemoryFlowTransaction {
    async fn insert_flow(&mut self, row: &FlowRow) -> Result<(), CoreError> {
        self.staged.insert_flow(row)
    }

    async fn update_flow(&mut self, row: &FlowRow) -> Result<u64, CoreError> {
        Ok(self.staged.update_flow(row))
    }

    async fn delete_flow(&mut self, kind: FlowKind, id: &FlowId) -> Result<u64, CoreError> {
        Ok(self.staged.delete_flow(kind, id))
    }

    async fn insert_flow_personas(&mut self, rows: &[FlowPersonaRow]) -> Result<(), CoreError> {
        self.staged.insert_flow_personas(rows)
    }

    async fn delete_flow_personas(&mut self, flow_id: &FlowId) -> Result<u64, CoreError> {
        Ok(self.staged.delete_flow_personas(flow_id))
    }

    async fn insert_step(&mut self, row: &StepRow) -> Result<(), CoreError> {
        self.staged.insert_step(row)
    }

    async fn update_step(&mut self, row: &StepRow) -> Result<u64, CoreError> {
        self.staged.update_step(row)
    }

    async fn delete_step(&mut self, flow_id: &FlowId, step_id: &StepId) -> Result<u64, CoreError> {
        Ok(self.staged.delete_step(flow_id, step_id))
    }

    async fn delete_steps(&mut self, flow_id: &FlowId) -> Result<u64, CoreError> {
        Ok(self.staged.delete_steps(flow_id))
    }

    async fn insert_actions(&mut self, rows: &[StepActionRow]) -> Result<(), CoreError> {
        self.staged.insert_actions(rows)
    }

    async fn update_action(&mut self, row: &StepActionRow) -> Result<u64, CoreError> {
        Ok(self.staged.update_action(row))
    }

    async fn delete_action(&mut self, step_id: &StepId, action_id: &StepActionId) -> Result<u64, CoreError> {
        Ok(self.staged.delete_action(step_id, action_id))
    }

    async fn delete_actions(&mut self, step_id: &StepId) -> Result<u64, CoreError> {
        Ok(self.staged.delete_actions(step_id))
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        let InMemoryFlowTransaction { mut live, staged } = *self;
        *live = staged;
        debug!("In-memory transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CoreError> {
        debug!("In-memory transaction rolled back");
        Ok(())
    }
}

/// In-memory owners, assets and personas
///
/// Implements every resolver trait, so one directory can back all three
/// lookups of an aggregate store.
#[derive(Default)]
pub struct InMemoryEntityDirectory {
    owners: RwLock<HashMap<OwnerId, Owner>>,
    assets: RwLock<HashMap<AssetId, Asset>>,
    personas: RwLock<HashMap<PersonaId, Persona>>,
}

impl InMemoryEntityDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an issuer or relying party
    pub async fn insert_owner(&self, owner: Owner) {
        self.owners.write().await.insert(owner.id, owner);
    }

    /// Add or replace an asset
    pub async fn insert_asset(&self, asset: Asset) {
        self.assets.write().await.insert(asset.id, asset);
    }

    /// Add or replace a persona
    pub async fn insert_persona(&self, persona: Persona) {
        self.personas.write().await.insert(persona.id, persona);
    }

    /// Remove an owner, returning it if present
    pub async fn remove_owner(&self, id: &OwnerId) -> Option<Owner> {
        self.owners.write().await.remove(id)
    }

    /// Remove a persona, returning it if present
    pub async fn remove_persona(&self, id: &PersonaId) -> Option<Persona> {
        self.personas.write().await.remove(id)
    }
}

#[async_trait]
impl OwnerResolver for InMemoryEntityDirectory {
    async fn find_by_id(&self, kind: OwnerKind, id: &OwnerId) -> Result<Owner, CoreError> {
        let owners = self.owners.read().await;
        owners
            .get(id)
            .filter(|owner| owner.kind == kind)
            .cloned()
            .ok_or_else(|| CoreError::not_found(kind.entity_kind(), id))
    }
}

#[async_trait]
impl AssetResolver for InMemoryEntityDirectory {
    async fn find_by_id(&self, id: &AssetId) -> Result<Asset, CoreError> {
        let assets = self.assets.read().await;
        assets
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Asset, id))
    }
}

#[async_trait]
impl PersonaResolver for InMemoryEntityDirectory {
    async fn find_by_id(&self, id: &PersonaId) -> Result<Persona, CoreError> {
        let personas = self.personas.read().await;
        personas
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Persona, id))
    }
}
