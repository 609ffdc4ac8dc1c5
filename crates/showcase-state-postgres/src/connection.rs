use showcase_core::CoreError;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{debug, info};

use crate::migrations::generate_migrations;
use crate::PostgresConfig;

/// Database connection manager for Postgres
#[derive(Clone)]
pub struct PostgresConnection {
    pub(crate) pool: PgPool,
}

impl PostgresConnection {
    /// Create a new PostgreSQL connection pool
    pub async fn new(
        connection_string: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, CoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(connection_string)
            .await
            .map_err(|e| CoreError::StateStoreError(format!("Failed to connect to database: {}", e)))?;

        debug!(max_connections, "Connected to PostgreSQL database");
        Ok(Self { pool })
    }

    /// Connect with the given configuration, running migrations if enabled
    pub async fn from_config(config: &PostgresConfig) -> Result<Self, CoreError> {
        let conn = Self::new(
            &config.connection_string,
            config.max_connections,
            Duration::from_secs(config.acquire_timeout_secs),
        )
        .await?;

        if config.run_migrations {
            conn.run_migrations().await?;
        }

        Ok(conn)
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply every migration in order
    ///
    /// Migrations are idempotent, so running them against an up-to-date
    /// schema is a no-op.
    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        info!("Running database migrations");

        for (name, sql) in generate_migrations() {
            debug!(migration = name, "Applying migration");
            sqlx::raw_sql(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| CoreError::StateStoreError(format!("Migration '{}' failed: {}", name, e)))?;
        }

        info!("Migrations completed successfully");
        Ok(())
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
