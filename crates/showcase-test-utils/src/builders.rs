//! Builders for flow, step and action payloads.

use showcase_core::{AssetId, NewFlow, NewStep, NewStepAction, OwnerId, PersonaId, StepKind};

/// Button action with the given title
pub fn action(title: &str) -> NewStepAction {
    NewStepAction {
        title: title.to_string(),
        action_type: "BUTTON".to_string(),
        text: format!("{} now", title),
    }
}

/// Builder for [`NewStep`] payloads
///
/// A new builder carries one default action so the payload is valid
/// unless the test clears it.
pub struct NewStepBuilder {
    step: NewStep,
}

impl NewStepBuilder {
    /// Step at the given position
    pub fn new(order: i32) -> Self {
        Self {
            step: NewStep {
                title: format!("Step {}", order),
                description: Some(format!("Description of step {}", order)),
                order,
                step_type: StepKind::HumanTask,
                asset_id: None,
                actions: vec![action("Next")],
            },
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.step.title = title.to_string();
        self
    }

    pub fn step_type(mut self, step_type: StepKind) -> Self {
        self.step.step_type = step_type;
        self
    }

    pub fn asset(mut self, asset_id: AssetId) -> Self {
        self.step.asset_id = Some(asset_id);
        self
    }

    /// Replace the actions
    pub fn actions(mut self, actions: Vec<NewStepAction>) -> Self {
        self.step.actions = actions;
        self
    }

    /// Drop every action, producing an invalid payload
    pub fn without_actions(self) -> Self {
        self.actions(Vec::new())
    }

    pub fn build(self) -> NewStep {
        self.step
    }
}

/// Builder for [`NewFlow`] payloads
pub struct NewFlowBuilder {
    flow: NewFlow,
}

impl NewFlowBuilder {
    /// Flow owned by the given issuer or relying party, with no steps yet
    pub fn new(owner_id: OwnerId) -> Self {
        Self {
            flow: NewFlow {
                name: "Student card".to_string(),
                description: "Get your student card".to_string(),
                owner_id,
                persona_ids: Vec::new(),
                steps: Vec::new(),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.flow.name = name.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.flow.description = description.to_string();
        self
    }

    pub fn persona(mut self, persona_id: PersonaId) -> Self {
        self.flow.persona_ids.push(persona_id);
        self
    }

    pub fn step(mut self, step: NewStep) -> Self {
        self.flow.steps.push(step);
        self
    }

    /// Add one default step per position, in the given order
    pub fn steps_at(self, orders: &[i32]) -> Self {
        orders
            .iter()
            .fold(self, |builder, order| builder.step(NewStepBuilder::new(*order).build()))
    }

    pub fn build(self) -> NewFlow {
        self.flow
    }
}
