//! Showcase flow persistence
//!
//! Facade over the workspace crates: the aggregate core, the in-memory and
//! PostgreSQL storage adapters and logging setup.

pub use showcase_core as aggregate;
pub use showcase_monitoring as monitoring;
pub use showcase_state_inmemory as inmemory;

#[cfg(feature = "postgres")]
pub use showcase_state_postgres as postgres;

pub use showcase_core::{
    CoreError, EntityKind, EntityResolvers, Flow, FlowAggregateStore, FlowId, FlowKind, NewFlow,
    NewStep, NewStepAction, Step, StepAction, StepActionId, StepId, StepKind,
};
