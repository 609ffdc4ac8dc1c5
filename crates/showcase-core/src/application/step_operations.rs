//! Step operations scoped to a parent flow

use std::collections::HashMap;
use std::slice;
use tracing::info;

use super::aggregate_store::{action_rows, finish, insert_steps, plan_step, FlowAggregateStore, StepWrite};
use super::assembler::assemble_steps;
use crate::domain::entities::Asset;
use crate::domain::flow::{NewStep, Step};
use crate::domain::ids::{AssetId, FlowId, StepId};
use crate::domain::ordering::validate_step_actions;
use crate::domain::repository::{StepRow, StepRowSet};
use crate::error::EntityKind;
use crate::CoreError;

impl FlowAggregateStore {
    /// Add a step with its actions to an existing flow
    pub async fn create_step(&self, flow_id: &FlowId, step: NewStep) -> Result<Step, CoreError> {
        self.require_flow(flow_id).await?;
        validate_step_actions(&step.actions)?;
        let assets = self.resolvers.resolve_step_assets(slice::from_ref(&step)).await?;

        let write = plan_step(flow_id, &step);

        let mut tx = self.store.begin().await?;
        let result = insert_steps(tx.as_mut(), slice::from_ref(&write)).await;
        finish(tx, result).await?;

        info!(flow_id = %flow_id, step_id = %write.step.id, order = write.step.order, "Step created");

        single_step(write, &assets)
    }

    /// Update a step's fields and replace its actions
    ///
    /// Every existing action of the step is deleted and the payload's actions
    /// are inserted with fresh ids.
    pub async fn update_step(&self, flow_id: &FlowId, step_id: &StepId, step: NewStep) -> Result<Step, CoreError> {
        self.require_flow(flow_id).await?;
        validate_step_actions(&step.actions)?;
        let assets = self.resolvers.resolve_step_assets(slice::from_ref(&step)).await?;

        let write = StepWrite {
            step: StepRow {
                id: *step_id,
                flow_id: *flow_id,
                title: step.title,
                description: step.description,
                order: step.order,
                step_type: step.step_type,
                asset_id: step.asset_id,
            },
            actions: action_rows(step_id, &step.actions),
        };

        let mut tx = self.store.begin().await?;
        let result = async {
            if tx.update_step(&write.step).await? == 0 {
                return Err(CoreError::not_found(EntityKind::Step, step_id));
            }
            tx.delete_actions(step_id).await?;
            tx.insert_actions(&write.actions).await
        }
        .await;
        finish(tx, result).await?;

        info!(flow_id = %flow_id, step_id = %step_id, actions = write.actions.len(), "Step updated");

        single_step(write, &assets)
    }

    /// Delete a step and its actions
    pub async fn delete_step(&self, flow_id: &FlowId, step_id: &StepId) -> Result<(), CoreError> {
        self.require_step(flow_id, step_id).await?;

        let mut tx = self.store.begin().await?;
        let result = async {
            if tx.delete_step(flow_id, step_id).await? == 0 {
                return Err(CoreError::not_found(EntityKind::Step, step_id));
            }
            Ok(())
        }
        .await;
        finish(tx, result).await?;

        info!(flow_id = %flow_id, step_id = %step_id, "Step deleted");
        Ok(())
    }

    /// Find a step of a flow by ID
    pub async fn find_by_step_id(&self, flow_id: &FlowId, step_id: &StepId) -> Result<Step, CoreError> {
        self.require_flow(flow_id).await?;

        let rows = self.store.select_step_rows(flow_id, Some(step_id)).await?;
        if rows.steps.is_empty() {
            return Err(CoreError::not_found(EntityKind::Step, step_id));
        }

        let assets = self.resolvers.resolve_step_row_assets(&rows.steps).await?;
        assemble_steps(rows, &assets)?
            .pop()
            .ok_or_else(|| CoreError::not_found(EntityKind::Step, step_id))
    }

    /// All steps of a flow, ascending by `order`
    pub async fn find_all_steps(&self, flow_id: &FlowId) -> Result<Vec<Step>, CoreError> {
        self.require_flow(flow_id).await?;

        let rows = self.store.select_step_rows(flow_id, None).await?;
        let assets = self.resolvers.resolve_step_row_assets(&rows.steps).await?;
        assemble_steps(rows, &assets)
    }
}

fn single_step(write: StepWrite, assets: &HashMap<AssetId, Asset>) -> Result<Step, CoreError> {
    let step_id = write.step.id;
    let rows = StepRowSet {
        steps: vec![write.step],
        actions: write.actions,
    };
    assemble_steps(rows, assets)?
        .pop()
        .ok_or_else(|| CoreError::not_found(EntityKind::Step, step_id))
}
