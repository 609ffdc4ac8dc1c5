//!
//! Showcase Core - aggregate persistence for showcase credential flows
//!
//! This crate defines the flow aggregate (flows, ordered steps and step
//! actions), the resolver contracts for the entities flows reference, the
//! storage port adapters implement, and the [`FlowAggregateStore`] that ties
//! them together transactionally.

#![forbid(unsafe_code)]

/// Domain layer - flow aggregate models, rules and ports
pub mod domain;

/// Application services - aggregate store and result assembly
pub mod application;

/// Error types
pub mod error;

// Re-export key types
pub use application::aggregate_store::FlowAggregateStore;
pub use error::{CoreError, EntityKind};

// Re-export main API types for easy use
pub use domain::entities::{Asset, CredentialDefinition, Owner, OwnerKind, Persona};
pub use domain::flow::{Flow, FlowKind, NewFlow, NewStep, NewStepAction, Step, StepAction, StepKind};
pub use domain::ids::{AssetId, CredentialDefinitionId, FlowId, OwnerId, PersonaId, StepActionId, StepId};
pub use domain::repository::{
    FlowPersonaRow, FlowRow, FlowRowSet, FlowStore, FlowStoreTransaction, StepActionRow, StepRow,
    StepRowSet,
};
pub use domain::resolver::{AssetResolver, EntityResolvers, OwnerResolver, PersonaResolver};
