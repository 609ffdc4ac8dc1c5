use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Identifier of an issuance or presentation flow
    FlowId
);
entity_id!(
    /// Identifier of a step
    StepId
);
entity_id!(
    /// Identifier of a step action
    StepActionId
);
entity_id!(
    /// Identifier of an issuer or relying party
    OwnerId
);
entity_id!(
    /// Identifier of an asset
    AssetId
);
entity_id!(
    /// Identifier of a persona
    PersonaId
);
entity_id!(
    /// Identifier of a credential definition
    CredentialDefinitionId
);
