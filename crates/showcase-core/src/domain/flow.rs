use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::{Asset, Owner, OwnerKind, Persona};
use super::ids::{AssetId, FlowId, OwnerId, PersonaId, StepActionId, StepId};

/// Issuance or presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowKind {
    /// Credential issuance, owned by an issuer
    Issuance,
    /// Credential presentation, owned by a relying party
    Presentation,
}

impl FlowKind {
    /// Owner kind that may own flows of this kind
    pub fn owner_kind(self) -> OwnerKind {
        match self {
            FlowKind::Issuance => OwnerKind::Issuer,
            FlowKind::Presentation => OwnerKind::RelyingParty,
        }
    }

    /// Only issuance flows link personas
    pub fn requires_personas(self) -> bool {
        matches!(self, FlowKind::Issuance)
    }

    /// Stable storage representation
    pub fn as_str(self) -> &'static str {
        match self {
            FlowKind::Issuance => "ISSUANCE",
            FlowKind::Presentation => "PRESENTATION",
        }
    }

    /// Parse the storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ISSUANCE" => Some(FlowKind::Issuance),
            "PRESENTATION" => Some(FlowKind::Presentation),
            _ => None,
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a step is carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    /// Performed by the user
    HumanTask,
    /// Performed by a backing service
    Service,
    /// Delegates to another workflow
    Workflow,
}

impl StepKind {
    /// Stable storage representation
    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::HumanTask => "HUMAN_TASK",
            StepKind::Service => "SERVICE",
            StepKind::Workflow => "WORKFLOW",
        }
    }

    /// Parse the storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "HUMAN_TASK" => Some(StepKind::HumanTask),
            "SERVICE" => Some(StepKind::Service),
            "WORKFLOW" => Some(StepKind::Workflow),
            _ => None,
        }
    }
}

/// Atomic action belonging to a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAction {
    /// Unique identifier
    pub id: StepActionId,

    /// Parent step
    pub step_id: StepId,

    /// Title
    pub title: String,

    /// Free-form action tag, e.g. "ARIES_OOB"
    pub action_type: String,

    /// Body text
    pub text: String,
}

/// Ordered unit of work inside a flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Unique identifier
    pub id: StepId,

    /// Parent flow
    pub flow_id: FlowId,

    /// Title
    pub title: String,

    /// Description
    pub description: Option<String>,

    /// Position within the flow, unique per flow
    pub order: i32,

    /// How the step is carried out
    pub step_type: StepKind,

    /// Resolved asset, when the step references one
    pub asset: Option<Asset>,

    /// Actions of the step, in insertion order
    pub actions: Vec<StepAction>,
}

/// Aggregate: issuance or presentation flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    /// Unique identifier
    pub id: FlowId,

    /// Name
    pub name: String,

    /// Description
    pub description: String,

    /// Issuance or presentation
    pub kind: FlowKind,

    /// Issuer (issuance) or relying party (presentation)
    pub owner: Owner,

    /// Personas linked to an issuance flow, empty for presentation flows
    pub personas: Vec<Persona>,

    /// Steps ordered by ascending `order`
    pub steps: Vec<Step>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or replacing a step action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStepAction {
    /// Title
    pub title: String,

    /// Free-form action tag
    pub action_type: String,

    /// Body text
    pub text: String,
}

/// Payload for creating or replacing a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStep {
    /// Title
    pub title: String,

    /// Description
    pub description: Option<String>,

    /// Position within the flow
    pub order: i32,

    /// How the step is carried out
    pub step_type: StepKind,

    /// Asset to attach
    pub asset_id: Option<AssetId>,

    /// Actions, at least one
    pub actions: Vec<NewStepAction>,
}

/// Payload for creating or replacing a flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFlow {
    /// Name
    pub name: String,

    /// Description
    pub description: String,

    /// Issuer or relying party, depending on the flow kind
    pub owner_id: OwnerId,

    /// Personas for issuance flows. Ignored for presentation flows.
    #[serde(default)]
    pub persona_ids: Vec<PersonaId>,

    /// Steps, at least one
    pub steps: Vec<NewStep>,
}
