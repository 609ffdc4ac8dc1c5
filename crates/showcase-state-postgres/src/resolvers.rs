use async_trait::async_trait;
use showcase_core::{
    Asset, AssetId, AssetResolver, CoreError, CredentialDefinition, EntityKind, Owner, OwnerId,
    OwnerKind, OwnerResolver, Persona, PersonaId, PersonaResolver,
};
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::repositories::{column, map_sqlx_error};
use crate::PostgresConnection;

/// Read-only lookups over the reference tables
///
/// Rows are written by whatever owns those entities; this type only reads
/// them.
#[derive(Clone)]
pub struct PostgresEntityResolver {
    conn: PostgresConnection,
}

impl PostgresEntityResolver {
    /// Create a new resolver over the given connection
    pub fn new(conn: PostgresConnection) -> Self {
        Self { conn }
    }

    async fn load_asset(&self, id: Uuid) -> Result<Asset, CoreError> {
        let row = sqlx::query(
            "SELECT id, media_type, file_name, description, content FROM assets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.conn.pool())
        .await
        .map_err(|e| map_sqlx_error("Failed to load asset", e))?;

        match row {
            Some(row) => asset_from_row(&row),
            None => Err(CoreError::not_found(EntityKind::Asset, id)),
        }
    }

    async fn load_optional_asset(&self, id: Option<Uuid>) -> Result<Option<Asset>, CoreError> {
        match id {
            Some(id) => self.load_asset(id).await.map(Some),
            None => Ok(None),
        }
    }

    async fn load_credential_definitions(&self, owner_id: &OwnerId) -> Result<Vec<CredentialDefinition>, CoreError> {
        let rows = sqlx::query(
            "SELECT cd.id, cd.name, cd.version, cd.icon FROM credential_definitions cd \
             JOIN owner_credential_definitions ocd ON ocd.credential_definition_id = cd.id \
             WHERE ocd.owner_id = $1 ORDER BY ocd.seq",
        )
        .bind(owner_id.0)
        .fetch_all(self.conn.pool())
        .await
        .map_err(|e| map_sqlx_error("Failed to load credential definitions", e))?;

        let mut definitions = Vec::with_capacity(rows.len());
        for row in &rows {
            definitions.push(CredentialDefinition {
                id: column::<Uuid>(row, "id")?.into(),
                name: column(row, "name")?,
                version: column(row, "version")?,
                icon: self.load_optional_asset(column(row, "icon")?).await?,
            });
        }
        Ok(definitions)
    }
}

fn asset_from_row(row: &PgRow) -> Result<Asset, CoreError> {
    Ok(Asset {
        id: column::<Uuid>(row, "id")?.into(),
        media_type: column(row, "media_type")?,
        file_name: column(row, "file_name")?,
        description: column(row, "description")?,
        content: column(row, "content")?,
    })
}

#[async_trait]
impl OwnerResolver for PostgresEntityResolver {
    async fn find_by_id(&self, kind: OwnerKind, id: &OwnerId) -> Result<Owner, CoreError> {
        let row = sqlx::query(
            "SELECT name, description, organization, logo FROM owners WHERE id = $1 AND kind = $2",
        )
        .bind(id.0)
        .bind(kind.as_str())
        .fetch_optional(self.conn.pool())
        .await
        .map_err(|e| map_sqlx_error("Failed to load owner", e))?
        .ok_or_else(|| CoreError::not_found(kind.entity_kind(), id))?;

        Ok(Owner {
            id: *id,
            kind,
            name: column(&row, "name")?,
            description: column(&row, "description")?,
            organization: column(&row, "organization")?,
            logo: self.load_optional_asset(column(&row, "logo")?).await?,
            credential_definitions: self.load_credential_definitions(id).await?,
        })
    }
}

#[async_trait]
impl AssetResolver for PostgresEntityResolver {
    async fn find_by_id(&self, id: &AssetId) -> Result<Asset, CoreError> {
        self.load_asset(id.0).await
    }
}

#[async_trait]
impl PersonaResolver for PostgresEntityResolver {
    async fn find_by_id(&self, id: &PersonaId) -> Result<Persona, CoreError> {
        let row = sqlx::query(
            "SELECT name, role, description, headshot_image, body_image FROM personas WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(self.conn.pool())
        .await
        .map_err(|e| map_sqlx_error("Failed to load persona", e))?
        .ok_or_else(|| CoreError::not_found(EntityKind::Persona, id))?;

        Ok(Persona {
            id: *id,
            name: column(&row, "name")?,
            role: column(&row, "role")?,
            description: column(&row, "description")?,
            headshot_image: self.load_optional_asset(column(&row, "headshot_image")?).await?,
            body_image: self.load_optional_asset(column(&row, "body_image")?).await?,
        })
    }
}
