/// Flow aggregate store
pub mod aggregate_store;

/// Step operations
mod step_operations;

/// Step action operations
mod action_operations;

/// Nested result assembly
pub mod assembler;

/// Resolver integration
mod resolution;
