/// SQLite persistence layer for workflow collections
///
/// Each collection is stored as one row per record, keyed by
/// `(collection, id)`, with the record serialized as JSON. Saving a collection
/// replaces its rows in a single transaction, so a flush is all-or-nothing and
/// repeating it is harmless.

use crate::collaborators::{CollaboratorError, DurableStorage};
use crate::workflow::types::Workflow;
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};

/// SQLite-based durable storage
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    /// SQLite connection pool for the project database
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create new storage instance with database connection
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the storage schema
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<(), CollaboratorError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entities (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                name TEXT NOT NULL,
                definition JSON NOT NULL,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_entities_name
            ON entities(collection, name)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl DurableStorage for SqliteStorage {
    async fn save(&self, collection: &str, records: &[Workflow]) -> Result<(), CollaboratorError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM entities WHERE collection = ?")
            .bind(collection)
            .execute(&mut *tx)
            .await?;

        for workflow in records {
            let definition_json = serde_json::to_string(workflow)?;
            sqlx::query(
                r#"
                INSERT INTO entities (collection, id, name, definition, updated_at)
                VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
                "#,
            )
            .bind(collection)
            .bind(&workflow.id)
            .bind(&workflow.name)
            .bind(&definition_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!("Saved {} record(s) to collection '{}'", records.len(), collection);
        Ok(())
    }

    async fn load(&self, collection: &str) -> Result<Vec<Workflow>, CollaboratorError> {
        let rows = sqlx::query("SELECT definition FROM entities WHERE collection = ? ORDER BY id")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        let mut workflows = Vec::with_capacity(rows.len());
        for row in rows {
            let definition_json: String = row.get("definition");
            workflows.push(serde_json::from_str(&definition_json)?);
        }

        Ok(workflows)
    }
}
