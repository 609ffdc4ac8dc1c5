//! Resolver integration for the aggregate store
//!
//! Lookups run one after another and stop at the first failure. Ids are
//! deduplicated so a shared asset or persona is fetched once per operation.

use std::collections::HashMap;

use tracing::debug;

use super::assembler::ResolvedReferences;
use crate::domain::entities::{Asset, Owner, Persona};
use crate::domain::flow::{FlowKind, NewFlow, NewStep};
use crate::domain::ids::{AssetId, OwnerId, PersonaId};
use crate::domain::repository::{FlowRowSet, StepRow};
use crate::domain::resolver::EntityResolvers;
use crate::CoreError;

impl EntityResolvers {
    /// Resolve the owner of a flow of the given kind
    pub(crate) async fn resolve_owner(&self, kind: FlowKind, id: &OwnerId) -> Result<Owner, CoreError> {
        debug!(flow_kind = %kind, owner_id = %id, "Resolving owner");
        self.owners.find_by_id(kind.owner_kind(), id).await
    }

    /// Resolve personas, keyed by id
    pub(crate) async fn resolve_personas(
        &self,
        ids: impl IntoIterator<Item = PersonaId>,
    ) -> Result<HashMap<PersonaId, Persona>, CoreError> {
        let mut personas = HashMap::new();
        for id in ids {
            if personas.contains_key(&id) {
                continue;
            }
            let persona = self.personas.find_by_id(&id).await?;
            personas.insert(id, persona);
        }
        Ok(personas)
    }

    /// Resolve assets, keyed by id
    pub(crate) async fn resolve_assets(
        &self,
        ids: impl IntoIterator<Item = AssetId>,
    ) -> Result<HashMap<AssetId, Asset>, CoreError> {
        let mut assets = HashMap::new();
        for id in ids {
            if assets.contains_key(&id) {
                continue;
            }
            let asset = self.assets.find_by_id(&id).await?;
            assets.insert(id, asset);
        }
        Ok(assets)
    }

    /// Resolve every reference of a flow payload before it is written
    pub(crate) async fn resolve_payload(
        &self,
        kind: FlowKind,
        flow: &NewFlow,
    ) -> Result<ResolvedReferences, CoreError> {
        let owner = self.resolve_owner(kind, &flow.owner_id).await?;

        let personas = if kind.requires_personas() {
            self.resolve_personas(flow.persona_ids.iter().copied()).await?
        } else {
            HashMap::new()
        };

        let assets = self.resolve_step_assets(&flow.steps).await?;

        let mut owners = HashMap::new();
        owners.insert(owner.id, owner);

        Ok(ResolvedReferences {
            owners,
            personas,
            assets,
        })
    }

    /// Resolve the assets referenced by step payloads
    pub(crate) async fn resolve_step_assets(
        &self,
        steps: &[NewStep],
    ) -> Result<HashMap<AssetId, Asset>, CoreError> {
        self.resolve_assets(steps.iter().filter_map(|step| step.asset_id)).await
    }

    /// Resolve the references of stored flow rows for a read
    pub(crate) async fn resolve_rows(&self, rows: &FlowRowSet) -> Result<ResolvedReferences, CoreError> {
        let mut owners = HashMap::new();
        for flow in &rows.flows {
            if owners.contains_key(&flow.owner_id) {
                continue;
            }
            let owner = self.resolve_owner(flow.kind, &flow.owner_id).await?;
            owners.insert(flow.owner_id, owner);
        }

        let personas = self
            .resolve_personas(rows.personas.iter().map(|link| link.persona_id))
            .await?;
        let assets = self.resolve_step_row_assets(&rows.steps).await?;

        Ok(ResolvedReferences {
            owners,
            personas,
            assets,
        })
    }

    /// Resolve the assets referenced by stored step rows
    pub(crate) async fn resolve_step_row_assets(
        &self,
        steps: &[StepRow],
    ) -> Result<HashMap<AssetId, Asset>, CoreError> {
        self.resolve_assets(steps.iter().filter_map(|step| step.asset_id)).await
    }
}
