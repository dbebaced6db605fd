/// Local key/value cache implementations
///
/// Values are JSON documents, kept by `SqliteCache` in the same database as
/// the workflows.

use crate::collaborators::{CollaboratorError, LocalCache};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{sqlite::SqlitePool, Row};

/// JSON array of workflow ids that have a remote backup
pub const BACKUP_IDS_KEY: &str = "backupIds";

/// Flag telling dependent consumers their cached workflow list is stale
pub const CLEAR_CACHE_KEY: &str = "clearCache";

/// Map of hosted workflow id -> hosting metadata
pub const HOSTED_WORKFLOWS_KEY: &str = "hostWorkflows";

/// Key of the cached execution state of one workflow
pub fn execution_state_key(workflow_id: &str) -> String {
    format!("state:{}", workflow_id)
}

/// SQLite-backed cache
#[derive(Debug, Clone)]
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the cache table. Safe to call multiple times.
    pub async fn init_schema(&self) -> Result<(), CollaboratorError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_cache (
                key TEXT PRIMARY KEY,
                value JSON NOT NULL,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LocalCache for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, CollaboratorError> {
        let row = sqlx::query("SELECT value FROM local_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("value");
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CollaboratorError> {
        sqlx::query(
            r#"
            INSERT INTO local_cache (key, value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CollaboratorError> {
        sqlx::query("DELETE FROM local_cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn sqlite_cache() -> SqliteCache {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let cache = SqliteCache::new(pool);
        cache.init_schema().await.unwrap();
        cache
    }

    #[tokio::test]
    async fn sqlite_cache_set_get_remove() {
        let cache = sqlite_cache().await;

        assert_eq!(cache.get(BACKUP_IDS_KEY).await.unwrap(), None);

        cache.set(BACKUP_IDS_KEY, json!(["w1", "w2"])).await.unwrap();
        cache.set(BACKUP_IDS_KEY, json!(["w2"])).await.unwrap();
        assert_eq!(cache.get(BACKUP_IDS_KEY).await.unwrap(), Some(json!(["w2"])));

        cache.remove(BACKUP_IDS_KEY).await.unwrap();
        assert_eq!(cache.get(BACKUP_IDS_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn removing_missing_key_is_fine() {
        let cache = sqlite_cache().await;
        cache.remove(&execution_state_key("nope")).await.unwrap();
    }

    #[tokio::test]
    async fn stale_flag_round() {
        let cache = sqlite_cache().await;
        cache.set(CLEAR_CACHE_KEY, json!(true)).await.unwrap();
        assert_eq!(cache.get(CLEAR_CACHE_KEY).await.unwrap(), Some(json!(true)));
    }

    #[test]
    fn state_key_format() {
        assert_eq!(execution_state_key("abc"), "state:abc");
    }
}
