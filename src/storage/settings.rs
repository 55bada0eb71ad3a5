use anyhow::Result;

use super::schema::Database;

/// Settings key holding the epoch-millis timestamp of the last successful
/// ingestion. The scheduling collaborator reads it to decide when the next
/// refresh is due; a failed ingestion leaves it untouched, so the refresh
/// stays due.
pub const LAST_INGESTED_KEY: &str = "ingest.last_run";

impl Database {
    // ========================================================================
    // Settings Operations
    // ========================================================================

    /// Get a single setting value by key.
    ///
    /// Keys use dotted convention: `ingest.last_run`, etc.
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Set a setting value (UPSERT), refreshing its `updated_at`.
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Epoch millis of the last successful ingestion, or `None` if no
    /// ingestion ever completed (a fresh cache is always "due").
    pub async fn last_ingested(&self) -> Result<Option<i64>> {
        let raw = self.get_setting(LAST_INGESTED_KEY).await?;
        Ok(raw.and_then(|v| v.parse::<i64>().ok()))
    }

    /// Record the last successful ingestion time outside an ingestion
    /// transaction. The pipeline itself writes this key through
    /// [`IngestionTx::record_ingestion_time`](super::IngestionTx::record_ingestion_time);
    /// this helper exists for embedders that need to reset or backdate the
    /// refresh clock.
    pub async fn set_last_ingested(&self, t: i64) -> Result<()> {
        self.set_setting(LAST_INGESTED_KEY, &t.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;
    use pretty_assertions::assert_eq;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_get_setting_missing() {
        let db = test_db().await;
        let value = db.get_setting("nonexistent.key").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_set_and_get_setting() {
        let db = test_db().await;
        db.set_setting("feed.url", "https://example.edu/rss")
            .await
            .unwrap();

        let value = db.get_setting("feed.url").await.unwrap();
        assert_eq!(value, Some("https://example.edu/rss".to_string()));
    }

    #[tokio::test]
    async fn test_set_setting_upsert() {
        let db = test_db().await;
        db.set_setting("feed.url", "https://old.example.edu")
            .await
            .unwrap();
        db.set_setting("feed.url", "https://new.example.edu")
            .await
            .unwrap();

        let value = db.get_setting("feed.url").await.unwrap();
        assert_eq!(value, Some("https://new.example.edu".to_string()));
    }

    #[tokio::test]
    async fn test_last_ingested_fresh_cache_is_none() {
        let db = test_db().await;
        assert_eq!(db.last_ingested().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_ingested_round_trip() {
        let db = test_db().await;
        db.set_last_ingested(1_212_491_130_000).await.unwrap();
        assert_eq!(db.last_ingested().await.unwrap(), Some(1_212_491_130_000));
    }

    #[tokio::test]
    async fn test_last_ingested_garbage_value_is_none() {
        let db = test_db().await;
        db.set_setting(super::LAST_INGESTED_KEY, "not-a-number")
            .await
            .unwrap();
        assert_eq!(db.last_ingested().await.unwrap(), None);
    }
}
