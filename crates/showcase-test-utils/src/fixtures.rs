//! Entity factories and a seeded in-memory environment.

use showcase_core::{
    Asset, AssetId, CredentialDefinition, CredentialDefinitionId, FlowAggregateStore, NewFlow,
    Owner, OwnerId, OwnerKind, Persona, PersonaId,
};
use showcase_state_inmemory::InMemoryStateStoreProvider;

use crate::builders::NewFlowBuilder;

/// PNG asset with a few bytes of content
pub fn asset(description: &str) -> Asset {
    Asset {
        id: AssetId::new(),
        media_type: "image/png".to_string(),
        file_name: Some(format!("{}.png", description.to_lowercase().replace(' ', "-"))),
        description: Some(description.to_string()),
        content: vec![0x89, 0x50, 0x4e, 0x47],
    }
}

/// Issuer with one credential definition
pub fn issuer() -> Owner {
    Owner {
        id: OwnerId::new(),
        kind: OwnerKind::Issuer,
        name: "Best BC College".to_string(),
        description: "Issues student cards".to_string(),
        organization: Some("Best BC College".to_string()),
        logo: Some(asset("College logo")),
        credential_definitions: vec![CredentialDefinition {
            id: CredentialDefinitionId::new(),
            name: "Student Card".to_string(),
            version: "1.0".to_string(),
            icon: None,
        }],
    }
}

/// Relying party without credential definitions
pub fn relying_party() -> Owner {
    Owner {
        id: OwnerId::new(),
        kind: OwnerKind::RelyingParty,
        name: "Cool Clothes Online".to_string(),
        description: "Offers student discounts".to_string(),
        organization: None,
        logo: None,
        credential_definitions: Vec::new(),
    }
}

pub fn persona(name: &str, role: &str) -> Persona {
    Persona {
        id: PersonaId::new(),
        name: name.to_string(),
        role: role.to_string(),
        description: None,
        headshot_image: Some(asset(&format!("{} headshot", name))),
        body_image: None,
    }
}

/// In-memory stores over a directory seeded with one issuer, one relying
/// party, two personas and one step asset
pub struct ShowcaseFixture {
    pub provider: InMemoryStateStoreProvider,
    pub issuance: FlowAggregateStore,
    pub presentation: FlowAggregateStore,
    pub issuer: Owner,
    pub relying_party: Owner,
    pub personas: Vec<Persona>,
    pub asset: Asset,
}

impl ShowcaseFixture {
    pub async fn new() -> Self {
        let provider = InMemoryStateStoreProvider::new();
        let directory = provider.directory();

        let issuer = issuer();
        let relying_party = relying_party();
        let personas = vec![persona("Ana", "Student"), persona("Bob", "Lawyer")];
        let asset = asset("Step image");

        directory.insert_owner(issuer.clone()).await;
        directory.insert_owner(relying_party.clone()).await;
        for persona in &personas {
            directory.insert_persona(persona.clone()).await;
        }
        directory.insert_asset(asset.clone()).await;

        let (issuance, presentation) = provider.create_repositories();

        Self {
            provider,
            issuance,
            presentation,
            issuer,
            relying_party,
            personas,
            asset,
        }
    }

    /// Issuance payload builder with the seeded issuer and first persona
    pub fn issuance_flow(&self) -> NewFlowBuilder {
        NewFlowBuilder::new(self.issuer.id).persona(self.personas[0].id)
    }

    /// Presentation payload builder with the seeded relying party
    pub fn presentation_flow(&self) -> NewFlowBuilder {
        NewFlowBuilder::new(self.relying_party.id).name("Student discount")
    }

    /// Issuance payload with default steps at the given positions
    pub fn issuance_payload(&self, orders: &[i32]) -> NewFlow {
        self.issuance_flow().steps_at(orders).build()
    }

    /// Committed flow, step and action row counts
    pub async fn row_counts(&self) -> (usize, usize, usize) {
        self.provider.flow_store().snapshot().await.row_counts()
    }
}
