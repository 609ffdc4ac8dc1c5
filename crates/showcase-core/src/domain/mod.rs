/// Entity identifiers
pub mod ids;

/// Flow aggregate domain models
pub mod flow;

/// Snapshots of externally owned entities
pub mod entities;

/// Step ordering and emptiness rules
pub mod ordering;

/// Resolver interfaces
pub mod resolver;

/// Storage port
pub mod repository;
