//! Step ordering and emptiness rules
//!
//! Uniqueness of `order` within a flow is left to the storage constraint.

use super::flow::{FlowKind, NewFlow, NewStepAction, Step};
use crate::CoreError;

/// Message for a flow payload without steps
pub const STEPS_REQUIRED: &str = "At least one step is required";

/// Message for a step payload without actions
pub const ACTIONS_REQUIRED: &str = "At least one action is required";

/// Message for an issuance flow payload without personas
pub const PERSONAS_REQUIRED: &str = "At least one persona is required";

/// Validate a flow payload for create or update
pub fn validate_flow(kind: FlowKind, flow: &NewFlow) -> Result<(), CoreError> {
    if flow.steps.is_empty() {
        return Err(CoreError::ValidationError(STEPS_REQUIRED.to_string()));
    }

    for step in &flow.steps {
        validate_step_actions(&step.actions)?;
    }

    if kind.requires_personas() && flow.persona_ids.is_empty() {
        return Err(CoreError::ValidationError(PERSONAS_REQUIRED.to_string()));
    }

    Ok(())
}

/// Validate the action list of a step created or updated as a unit
pub fn validate_step_actions(actions: &[NewStepAction]) -> Result<(), CoreError> {
    if actions.is_empty() {
        return Err(CoreError::ValidationError(ACTIONS_REQUIRED.to_string()));
    }
    Ok(())
}

/// Sort steps by ascending `order`. Stable, so ties keep their input order.
pub fn sort_steps(steps: &mut [Step]) {
    steps.sort_by_key(|step| step.order);
}
