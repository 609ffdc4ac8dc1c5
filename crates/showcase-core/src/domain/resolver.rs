//! Read-only lookup contracts for entities referenced by flows
//!
//! Every implementation must fail with [`CoreError::NotFound`] when the id
//! does not resolve. The aggregate store relies on that to reject payloads
//! before opening a transaction.

use async_trait::async_trait;
use std::sync::Arc;

use super::entities::{Asset, Owner, OwnerKind, Persona};
use super::ids::{AssetId, OwnerId, PersonaId};
use crate::CoreError;

/// Resolves issuers and relying parties
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OwnerResolver: Send + Sync {
    /// Find an owner of the given kind by ID
    async fn find_by_id(&self, kind: OwnerKind, id: &OwnerId) -> Result<Owner, CoreError>;
}

/// Resolves assets
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetResolver: Send + Sync {
    /// Find an asset by ID
    async fn find_by_id(&self, id: &AssetId) -> Result<Asset, CoreError>;
}

/// Resolves personas
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersonaResolver: Send + Sync {
    /// Find a persona by ID
    async fn find_by_id(&self, id: &PersonaId) -> Result<Persona, CoreError>;
}

/// The resolvers an aggregate store is constructed with
#[derive(Clone)]
pub struct EntityResolvers {
    /// Issuer / relying party lookups
    pub owners: Arc<dyn OwnerResolver>,

    /// Asset lookups
    pub assets: Arc<dyn AssetResolver>,

    /// Persona lookups
    pub personas: Arc<dyn PersonaResolver>,
}

impl EntityResolvers {
    /// Bundle three resolvers
    pub fn new(
        owners: Arc<dyn OwnerResolver>,
        assets: Arc<dyn AssetResolver>,
        personas: Arc<dyn PersonaResolver>,
    ) -> Self {
        Self {
            owners,
            assets,
            personas,
        }
    }

    /// Use one value that implements every resolver
    pub fn from_directory<T>(directory: Arc<T>) -> Self
    where
        T: OwnerResolver + AssetResolver + PersonaResolver + 'static,
    {
        Self {
            owners: directory.clone(),
            assets: directory.clone(),
            personas: directory,
        }
    }
}
