//! In-memory state store for showcase flows
//!
//! This crate provides in-memory implementations of the storage port and
//! resolver contracts defined in showcase-core. It is primarily useful for
//! development and testing where persistence is not required.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use showcase_core::{EntityResolvers, FlowAggregateStore};

pub mod repositories;
pub use repositories::{
    FlowTables, InMemoryEntityDirectory, InMemoryFlowStore, InMemoryFlowTransaction,
    STEP_ORDER_CONSTRAINT,
};

/// Provider for in-memory flow stores
///
/// Issuance and presentation stores share the same tables and the same
/// entity directory.
pub struct InMemoryStateStoreProvider {
    // Shared tables of the flow aggregate
    tables: Arc<RwLock<FlowTables>>,

    // Shared owners, assets and personas
    directory: Arc<InMemoryEntityDirectory>,
}

impl InMemoryStateStoreProvider {
    /// Create a new provider with empty tables and an empty directory
    pub fn new() -> Self {
        Self::with_directory(Arc::new(InMemoryEntityDirectory::new()))
    }

    /// Create a provider that resolves references through an existing directory
    pub fn with_directory(directory: Arc<InMemoryEntityDirectory>) -> Self {
        Self {
            tables: Arc::new(RwLock::new(FlowTables::default())),
            directory,
        }
    }

    /// Directory used to resolve owners, assets and personas
    pub fn directory(&self) -> Arc<InMemoryEntityDirectory> {
        self.directory.clone()
    }

    /// Storage port over the shared tables
    pub fn flow_store(&self) -> Arc<InMemoryFlowStore> {
        Arc::new(InMemoryFlowStore::new(self.tables.clone()))
    }

    /// Create the issuance and presentation aggregate stores
    pub fn create_repositories(&self) -> (FlowAggregateStore, FlowAggregateStore) {
        debug!("Creating in-memory flow aggregate stores");

        let resolvers = EntityResolvers::from_directory(self.directory.clone());
        let issuance = FlowAggregateStore::issuance(self.flow_store(), resolvers.clone());
        let presentation = FlowAggregateStore::presentation(self.flow_store(), resolvers);

        (issuance, presentation)
    }
}

impl Default for InMemoryStateStoreProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
