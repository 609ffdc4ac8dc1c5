use async_trait::async_trait;
use showcase_core::{
    CoreError, FlowId, FlowKind, FlowPersonaRow, FlowRow, FlowRowSet, FlowStore,
    FlowStoreTransaction, StepActionId, StepActionRow, StepId, StepKind, StepRow, StepRowSet,
};
use sqlx::error::ErrorKind;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::PostgresConnection;

const FLOW_COLUMNS: &str = "f.id, f.kind, f.name, f.description, f.owner_id, f.created_at, f.updated_at";
const STEP_COLUMNS: &str = r#"s.id, s.flow_id, s.title, s.description, s."order", s.step_type, s.asset_id"#;
const ACTION_COLUMNS: &str = "a.id, a.step_id, a.title, a.action_type, a.text";

/// Map a sqlx error onto the core error type
///
/// Integrity violations keep the constraint name and the server's message
/// so callers see exactly what the database rejected.
pub(crate) fn map_sqlx_error(context: &str, err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::CheckViolation
            | ErrorKind::NotNullViolation => {
                return CoreError::ConstraintViolation {
                    constraint: db.constraint().unwrap_or_default().to_string(),
                    message: db.message().to_string(),
                };
            }
            _ => {}
        }
    }
    CoreError::StateStoreError(format!("{}: {}", context, err))
}

pub(crate) fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, CoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| CoreError::StateStoreError(format!("Failed to read column '{}': {}", name, e)))
}

fn flow_from_row(row: &PgRow) -> Result<FlowRow, CoreError> {
    let kind: String = column(row, "kind")?;
    Ok(FlowRow {
        id: FlowId(column(row, "id")?),
        kind: FlowKind::parse(&kind)
            .ok_or_else(|| CoreError::StateStoreError(format!("Unknown flow kind: {}", kind)))?,
        name: column(row, "name")?,
        description: column(row, "description")?,
        owner_id: column::<Uuid>(row, "owner_id")?.into(),
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn persona_link_from_row(row: &PgRow) -> Result<FlowPersonaRow, CoreError> {
    Ok(FlowPersonaRow {
        flow_id: FlowId(column(row, "flow_id")?),
        persona_id: column::<Uuid>(row, "persona_id")?.into(),
    })
}

fn step_from_row(row: &PgRow) -> Result<StepRow, CoreError> {
    let step_type: String = column(row, "step_type")?;
    Ok(StepRow {
        id: StepId(column(row, "id")?),
        flow_id: FlowId(column(row, "flow_id")?),
        title: column(row, "title")?,
        description: column(row, "description")?,
        order: column(row, "order")?,
        step_type: StepKind::parse(&step_type)
            .ok_or_else(|| CoreError::StateStoreError(format!("Unknown step type: {}", step_type)))?,
        asset_id: column::<Option<Uuid>>(row, "asset_id")?.map(Into::into),
    })
}

fn action_from_row(row: &PgRow) -> Result<StepActionRow, CoreError> {
    Ok(StepActionRow {
        id: StepActionId(column(row, "id")?),
        step_id: StepId(column(row, "step_id")?),
        title: column(row, "title")?,
        action_type: column(row, "action_type")?,
        text: column(row, "text")?,
    })
}

fn decode_all<T>(rows: &[PgRow], decode: fn(&PgRow) -> Result<T, CoreError>) -> Result<Vec<T>, CoreError> {
    rows.iter().map(decode).collect()
}

/// Postgres implementation of the flow storage port
#[derive(Clone)]
pub struct PostgresFlowStore {
    conn: PostgresConnection,
}

impl PostgresFlowStore {
    /// Create a new Postgres flow store
    pub fn new(conn: PostgresConnection) -> Self {
        Self { conn }
    }

    /// Start a read-only transaction so multi-table reads share one snapshot
    async fn begin_snapshot(&self) -> Result<Transaction<'static, Postgres>, CoreError> {
        let mut tx = self
            .conn
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to begin read transaction", e))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to set read isolation", e))?;

        Ok(tx)
    }
}

async fn end_snapshot(tx: Transaction<'static, Postgres>) -> Result<(), CoreError> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("Failed to end read transaction", e))
}

#[async_trait]
impl FlowStore for PostgresFlowStore {
    async fn begin(&self) -> Result<Box<dyn FlowStoreTransaction>, CoreError> {
        let tx = self
            .conn
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to begin transaction", e))?;
        debug!("PostgreSQL transaction started");
        Ok(Box::new(PostgresFlowTransaction { tx }))
    }

    async fn select_flow(&self, kind: FlowKind, id: &FlowId) -> Result<Option<FlowRow>, CoreError> {
        let query = format!("SELECT {} FROM flows f WHERE f.id = $1 AND f.kind = $2", FLOW_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id.0)
            .bind(kind.as_str())
            .fetch_optional(self.conn.pool())
            .await
            .map_err(|e| map_sqlx_error("Failed to load flow", e))?;

        row.as_ref().map(flow_from_row).transpose()
    }

    async fn select_flow_rows(
        &self,
        kind: FlowKind,
        id: Option<&FlowId>,
    ) -> Result<FlowRowSet, CoreError> {
        let mut tx = self.begin_snapshot().await?;
        let flow_id = id.map(|id| id.0);
        let filter = "f.kind = $1 AND ($2::uuid IS NULL OR f.id = $2)";

        let flows = sqlx::query(&format!(
            "SELECT {} FROM flows f WHERE {} ORDER BY f.seq",
            FLOW_COLUMNS, filter
        ))
        .bind(kind.as_str())
        .bind(flow_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to load flows", e))?;

        let personas = sqlx::query(&format!(
            "SELECT fp.flow_id, fp.persona_id FROM flow_personas fp \
             JOIN flows f ON f.id = fp.flow_id WHERE {} ORDER BY f.seq, fp.seq",
            filter
        ))
        .bind(kind.as_str())
        .bind(flow_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to load flow personas", e))?;

        let steps = sqlx::query(&format!(
            "SELECT {} FROM steps s JOIN flows f ON f.id = s.flow_id WHERE {} ORDER BY s.\"order\"",
            STEP_COLUMNS, filter
        ))
        .bind(kind.as_str())
        .bind(flow_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to load steps", e))?;

        let actions = sqlx::query(&format!(
            "SELECT {} FROM step_actions a JOIN steps s ON s.id = a.step_id \
             JOIN flows f ON f.id = s.flow_id WHERE {} ORDER BY a.seq",
            ACTION_COLUMNS, filter
        ))
        .bind(kind.as_str())
        .bind(flow_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to load step actions", e))?;

        end_snapshot(tx).await?;

        debug!(
            flow_kind = %kind,
            flows = flows.len(),
            steps = steps.len(),
            actions = actions.len(),
            "Loaded flow rows"
        );

        Ok(FlowRowSet {
            flows: decode_all(&flows, flow_from_row)?,
            personas: decode_all(&personas, persona_link_from_row)?,
            steps: decode_all(&steps, step_from_row)?,
            actions: decode_all(&actions, action_from_row)?,
        })
    }

    async fn select_step(&self, flow_id: &FlowId, step_id: &StepId) -> Result<Option<StepRow>, CoreError> {
        let query = format!("SELECT {} FROM steps s WHERE s.flow_id = $1 AND s.id = $2", STEP_COLUMNS);

        let row = sqlx::query(&query)
            .bind(flow_id.0)
            .bind(step_id.0)
            .fetch_optional(self.conn.pool())
            .await
            .map_err(|e| map_sqlx_error("Failed to load step", e))?;

        row.as_ref().map(step_from_row).transpose()
    }

    async fn select_step_rows(
        &self,
        flow_id: &FlowId,
        step_id: Option<&StepId>,
    ) -> Result<StepRowSet, CoreError> {
        let mut tx = self.begin_snapshot().await?;
        let step_id = step_id.map(|id| id.0);
        let filter = "s.flow_id = $1 AND ($2::uuid IS NULL OR s.id = $2)";

        let steps = sqlx::query(&format!(
            "SELECT {} FROM steps s WHERE {} ORDER BY s.\"order\"",
            STEP_COLUMNS, filter
        ))
        .bind(flow_id.0)
        .bind(step_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to load steps", e))?;

        let actions = sqlx::query(&format!(
            "SELECT {} FROM step_actions a JOIN steps s ON s.id = a.step_id WHERE {} ORDER BY a.seq",
            ACTION_COLUMNS, filter
        ))
        .bind(flow_id.0)
        .bind(step_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to load step actions", e))?;

        end_snapshot(tx).await?;

        Ok(StepRowSet {
            steps: decode_all(&steps, step_from_row)?,
            actions: decode_all(&actions, action_from_row)?,
        })
    }

    async fn select_actions(
        &self,
        step_id: &StepId,
        action_id: Option<&StepActionId>,
    ) -> Result<Vec<StepActionRow>, CoreError> {
        let query = format!(
            "SELECT {} FROM step_actions a WHERE a.step_id = $1 AND ($2::uuid IS NULL OR a.id = $2) ORDER BY a.seq",
            ACTION_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(step_id.0)
            .bind(action_id.map(|id| id.0))
            .fetch_all(self.conn.pool())
            .await
            .map_err(|e| map_sqlx_error("Failed to load step actions", e))?;

        decode_all(&rows, action_from_row)
    }
}

/// Write transaction on a pooled connection
///
/// Dropping it without `commit` rolls the transaction back.
pub struct PostgresFlowTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl FlowStoreTransaction for PostgresFlowTransaction {
    async fn insert_flow(&mut self, row: &FlowRow) -> Result<(), CoreError> {
        sqlx::query(
            "INSERT INTO flows (id, kind, name, description, owner_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(row.id.0)
        .bind(row.kind.as_str())
        .bind(&row.name)
        .bind(&row.description)
        .bind(row.owner_id.0)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to insert flow", e))?;
        Ok(())
    }

    async fn update_flow(&mut self, row: &FlowRow) -> Result<u64, CoreError> {
        let result = sqlx::query(
            "UPDATE flows SET name = $3, description = $4, owner_id = $5, updated_at = $6 \
             WHERE id = $1 AND kind = $2",
        )
        .bind(row.id.0)
        .bind(row.kind.as_str())
        .bind(&row.name)
        .bind(&row.description)
        .bind(row.owner_id.0)
        .bind(row.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to update flow", e))?;
        Ok(result.rows_affected())
    }

    async fn delete_flow(&mut self, kind: FlowKind, id: &FlowId) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM flows WHERE id = $1 AND kind = $2")
            .bind(id.0)
            .bind(kind.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete flow", e))?;
        Ok(result.rows_affected())
    }

    async fn insert_flow_personas(&mut self, rows: &[FlowPersonaRow]) -> Result<(), CoreError> {
        for row in rows {
            sqlx::query("INSERT INTO flow_personas (flow_id, persona_id) VALUES ($1, $2)")
                .bind(row.flow_id.0)
                .bind(row.persona_id.0)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("Failed to link persona", e))?;
        }
        Ok(())
    }

    async fn delete_flow_personas(&mut self, flow_id: &FlowId) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM flow_personas WHERE flow_id = $1")
            .bind(flow_id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to unlink personas", e))?;
        Ok(result.rows_affected())
    }

    async fn insert_step(&mut self, row: &StepRow) -> Result<(), CoreError> {
        sqlx::query(
            r#"INSERT INTO steps (id, flow_id, title, description, "order", step_type, asset_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(row.id.0)
        .bind(row.flow_id.0)
        .bind(&row.title)
        .bind(&row.description)
        .bind(row.order)
        .bind(row.step_type.as_str())
        .bind(row.asset_id.map(|id| id.0))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to insert step", e))?;
        Ok(())
    }

    async fn update_step(&mut self, row: &StepRow) -> Result<u64, CoreError> {
        let result = sqlx::query(
            r#"UPDATE steps SET title = $3, description = $4, "order" = $5, step_type = $6, asset_id = $7
               WHERE id = $1 AND flow_id = $2"#,
        )
        .bind(row.id.0)
        .bind(row.flow_id.0)
        .bind(&row.title)
        .bind(&row.description)
        .bind(row.order)
        .bind(row.step_type.as_str())
        .bind(row.asset_id.map(|id| id.0))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to update step", e))?;
        Ok(result.rows_affected())
    }

    async fn delete_step(&mut self, flow_id: &FlowId, step_id: &StepId) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM steps WHERE id = $1 AND flow_id = $2")
            .bind(step_id.0)
            .bind(flow_id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete step", e))?;
        Ok(result.rows_affected())
    }

    async fn delete_steps(&mut self, flow_id: &FlowId) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM steps WHERE flow_id = $1")
            .bind(flow_id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete steps", e))?;
        Ok(result.rows_affected())
    }

    async fn insert_actions(&mut self, rows: &[StepActionRow]) -> Result<(), CoreError> {
        for row in rows {
            sqlx::query(
                "INSERT INTO step_actions (id, step_id, title, action_type, text) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(row.id.0)
            .bind(row.step_id.0)
            .bind(&row.title)
            .bind(&row.action_type)
            .bind(&row.text)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to insert step action", e))?;
        }
        Ok(())
    }

    async fn update_action(&mut self, row: &StepActionRow) -> Result<u64, CoreError> {
        let result = sqlx::query(
            "UPDATE step_actions SET title = $3, action_type = $4, text = $5 WHERE id = $1 AND step_id = $2",
        )
        .bind(row.id.0)
        .bind(row.step_id.0)
        .bind(&row.title)
        .bind(&row.action_type)
        .bind(&row.text)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to update step action", e))?;
        Ok(result.rows_affected())
    }

    async fn delete_action(&mut self, step_id: &StepId, action_id: &StepActionId) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM step_actions WHERE id = $1 AND step_id = $2")
            .bind(action_id.0)
            .bind(step_id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete step action", e))?;
        Ok(result.rows_affected())
    }

    async fn delete_actions(&mut self, step_id: &StepId) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM step_actions WHERE step_id = $1")
            .bind(step_id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete step actions", e))?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        let PostgresFlowTransaction { tx } = *self;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit transaction", e))?;
        debug!("PostgreSQL transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CoreError> {
        let PostgresFlowTransaction { tx } = *self;
        tx.rollback()
            .await
            .map_err(|e| map_sqlx_error("Failed to roll back transaction", e))?;
        debug!("PostgreSQL transaction rolled back");
        Ok(())
    }
}
