//! Step action operations scoped to a parent flow and step

use std::slice;
use tracing::info;

use super::aggregate_store::{action_row, finish, FlowAggregateStore};
use crate::domain::flow::{NewStepAction, StepAction};
use crate::domain::ids::{FlowId, StepActionId, StepId};
use crate::error::EntityKind;
use crate::CoreError;

impl FlowAggregateStore {
    /// Add an action to an existing step
    pub async fn create_step_action(
        &self,
        flow_id: &FlowId,
        step_id: &StepId,
        action: NewStepAction,
    ) -> Result<StepAction, CoreError> {
        self.require_step(flow_id, step_id).await?;

        let row = action_row(StepActionId::new(), step_id, &action);

        let mut tx = self.store.begin().await?;
        let result = tx.insert_actions(slice::from_ref(&row)).await;
        finish(tx, result).await?;

        info!(flow_id = %flow_id, step_id = %step_id, action_id = %row.id, "Step action created");
        Ok(row.into())
    }

    /// Overwrite an action of a step
    ///
    /// Only the parent flow and step are checked up front; an unknown action
    /// id is reported by the update itself.
    pub async fn update_step_action(
        &self,
        flow_id: &FlowId,
        step_id: &StepId,
        action_id: &StepActionId,
        action: NewStepAction,
    ) -> Result<StepAction, CoreError> {
        self.require_step(flow_id, step_id).await?;

        let row = action_row(*action_id, step_id, &action);

        let mut tx = self.store.begin().await?;
        let result = async {
            if tx.update_action(&row).await? == 0 {
                return Err(CoreError::not_found(EntityKind::StepAction, action_id));
            }
            Ok(())
        }
        .await;
        finish(tx, result).await?;

        info!(flow_id = %flow_id, step_id = %step_id, action_id = %action_id, "Step action updated");
        Ok(row.into())
    }

    /// Delete one action of a step
    pub async fn delete_step_action(
        &self,
        flow_id: &FlowId,
        step_id: &StepId,
        action_id: &StepActionId,
    ) -> Result<(), CoreError> {
        self.require_action(flow_id, step_id, action_id).await?;

        let mut tx = self.store.begin().await?;
        let result = async {
            if tx.delete_action(step_id, action_id).await? == 0 {
                return Err(CoreError::not_found(EntityKind::StepAction, action_id));
            }
            Ok(())
        }
        .await;
        finish(tx, result).await?;

        info!(flow_id = %flow_id, step_id = %step_id, action_id = %action_id, "Step action deleted");
        Ok(())
    }

    /// Find an action of a step by ID
    pub async fn find_by_step_action_id(
        &self,
        flow_id: &FlowId,
        step_id: &StepId,
        action_id: &StepActionId,
    ) -> Result<StepAction, CoreError> {
        self.require_action(flow_id, step_id, action_id).await
    }

    /// All actions of a step, in insertion order
    pub async fn find_all_step_actions(
        &self,
        flow_id: &FlowId,
        step_id: &StepId,
    ) -> Result<Vec<StepAction>, CoreError> {
        self.require_step(flow_id, step_id).await?;

        let rows = self.store.select_actions(step_id, None).await?;
        Ok(rows.into_iter().map(StepAction::from).collect())
    }

    async fn require_action(
        &self,
        flow_id: &FlowId,
        step_id: &StepId,
        action_id: &StepActionId,
    ) -> Result<StepAction, CoreError> {
        self.require_step(flow_id, step_id).await?;

        self.store
            .select_actions(step_id, Some(action_id))
            .await?
            .pop()
            .map(StepAction::from)
            .ok_or_else(|| CoreError::not_found(EntityKind::StepAction, action_id))
    }
}
