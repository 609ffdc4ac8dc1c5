//! Snapshots of entities owned outside the flow aggregate
//!
//! Flows reference these by id and embed resolved copies in assembled
//! results. Nothing in this crate mutates them.

use serde::{Deserialize, Serialize};

use super::ids::{AssetId, CredentialDefinitionId, OwnerId, PersonaId};
use crate::error::EntityKind;

/// Media asset (logos, step images, persona portraits)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier
    pub id: AssetId,

    /// MIME type of the content
    pub media_type: String,

    /// Original file name
    pub file_name: Option<String>,

    /// Human readable description
    pub description: Option<String>,

    /// Raw content
    pub content: Vec<u8>,
}

/// Character a user plays in an issuance flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Unique identifier
    pub id: PersonaId,

    /// Display name
    pub name: String,

    /// Role in the showcase, e.g. "Student"
    pub role: String,

    /// Description
    pub description: Option<String>,

    /// Headshot image
    pub headshot_image: Option<Asset>,

    /// Full body image
    pub body_image: Option<Asset>,
}

/// Credential definition published by an owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDefinition {
    /// Unique identifier
    pub id: CredentialDefinitionId,

    /// Name
    pub name: String,

    /// Version string
    pub version: String,

    /// Icon
    pub icon: Option<Asset>,
}

/// Which side of the credential exchange an owner sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerKind {
    /// Issues credentials
    Issuer,
    /// Requests credential presentations
    RelyingParty,
}

impl OwnerKind {
    /// Entity kind reported when an owner of this kind cannot be found
    pub fn entity_kind(self) -> EntityKind {
        match self {
            OwnerKind::Issuer => EntityKind::Issuer,
            OwnerKind::RelyingParty => EntityKind::RelyingParty,
        }
    }

    /// Stable storage representation
    pub fn as_str(self) -> &'static str {
        match self {
            OwnerKind::Issuer => "ISSUER",
            OwnerKind::RelyingParty => "RELYING_PARTY",
        }
    }

    /// Parse the storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ISSUER" => Some(OwnerKind::Issuer),
            "RELYING_PARTY" => Some(OwnerKind::RelyingParty),
            _ => None,
        }
    }
}

/// Issuer or relying party a flow belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Unique identifier
    pub id: OwnerId,

    /// Issuer or relying party
    pub kind: OwnerKind,

    /// Display name
    pub name: String,

    /// Description
    pub description: String,

    /// Organization the owner represents
    pub organization: Option<String>,

    /// Logo
    pub logo: Option<Asset>,

    /// Credential definitions issued or requested by this owner
    pub credential_definitions: Vec<CredentialDefinition>,
}
