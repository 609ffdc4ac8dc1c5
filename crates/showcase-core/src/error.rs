use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of entity named by a [`CoreError::NotFound`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Issuance or presentation flow
    Flow,
    /// Step of a flow
    Step,
    /// Action of a step
    StepAction,
    /// Owner of an issuance flow
    Issuer,
    /// Owner of a presentation flow
    RelyingParty,
    /// Media asset
    Asset,
    /// Persona acting in an issuance flow
    Persona,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Flow => "Flow",
            EntityKind::Step => "Step",
            EntityKind::StepAction => "Step action",
            EntityKind::Issuer => "Issuer",
            EntityKind::RelyingParty => "Relying party",
            EntityKind::Asset => "Asset",
            EntityKind::Persona => "Persona",
        };
        f.write_str(name)
    }
}

/// Core error type for flow persistence
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Payload rejected before any storage mutation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Referenced entity does not exist
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Kind of the missing entity
        entity: EntityKind,
        /// Identifier that failed to resolve
        id: String,
    },

    /// Constraint rejected by the storage engine. The message is the engine's own.
    #[error("{message}")]
    ConstraintViolation {
        /// Name of the violated constraint, empty when the engine did not report one
        constraint: String,
        /// Engine error message
        message: String,
    },

    /// Any other storage failure
    #[error("State store error: {0}")]
    StateStoreError(String),
}

impl CoreError {
    /// Build a not-found error for an entity of the given kind
    pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether this error was raised by a storage constraint
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, CoreError::ConstraintViolation { .. })
    }
}
