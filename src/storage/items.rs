use anyhow::Result;
use sqlx::Sqlite;

use super::schema::Database;
use super::settings::LAST_INGESTED_KEY;
use super::types::StoredItem;
use crate::feed::NewsItem;

// ============================================================================
// Query Limit Constants
// ============================================================================

/// Default number of items returned by the read path
const DEFAULT_ITEMS: i64 = 500;

/// Maximum number of items to return from any single query (OOM protection)
const MAX_ITEMS: i64 = 2000;

// ============================================================================
// Ingestion Transaction
// ============================================================================

/// One cache-generation replacement in flight.
///
/// Created by [`Database::begin_ingestion`], which deletes the previous
/// generation *inside* the transaction — readers keep seeing the old
/// generation until [`commit`](Self::commit), so there is no observable
/// empty-cache window, and a crash rolls the whole replacement back
/// (the store is never left emptied without its successor, and the
/// timestamp never advances without the rows it describes).
///
/// Ordering contract: all [`store`](Self::store) calls belong to this one
/// generation, and [`record_ingestion_time`](Self::record_ingestion_time)
/// must only run after the last store.
pub struct IngestionTx {
    tx: sqlx::Transaction<'static, Sqlite>,
    stored: usize,
}

impl Database {
    /// Start replacing the cache generation: opens a transaction and
    /// clears all previously stored items within it.
    pub async fn begin_ingestion(&self) -> Result<IngestionTx> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM items").execute(&mut *tx).await?;

        Ok(IngestionTx { tx, stored: 0 })
    }
}

impl IngestionTx {
    /// Append one parsed item, in document order. Duplicates within a
    /// feed are stored as separate rows; this layer enforces no
    /// uniqueness on title or link.
    pub async fn store(&mut self, item: &NewsItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (title, description, link, category, published)
            VALUES (?, ?, ?, ?, ?)
        "#,
        )
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.link)
        .bind(&item.category)
        .bind(item.published)
        .execute(&mut *self.tx)
        .await?;

        self.stored += 1;
        Ok(())
    }

    /// Record the wall-clock time of this ingestion (epoch millis) in the
    /// settings table, within the same transaction as the item rows.
    pub async fn record_ingestion_time(&mut self, t: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(LAST_INGESTED_KEY)
        .bind(t.to_string())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Number of items stored so far in this generation.
    pub fn stored(&self) -> usize {
        self.stored
    }

    /// Commit the generation, returning the number of rows stored.
    pub async fn commit(self) -> Result<usize> {
        self.tx.commit().await?;
        Ok(self.stored)
    }
}

// ============================================================================
// Read Path
// ============================================================================

impl Database {
    /// Get cached items, newest publication first. Items whose `pubDate`
    /// did not parse sort last (SQL NULLs are smallest, DESC puts them at
    /// the end).
    ///
    /// `limit` defaults to 500 and is hard-capped at 2000.
    pub async fn items(&self, limit: Option<i64>) -> Result<Vec<StoredItem>> {
        let limit = limit.unwrap_or(DEFAULT_ITEMS).min(MAX_ITEMS);

        let items = sqlx::query_as::<_, StoredItem>(
            r#"
            SELECT id, title, description, link, category, published
            FROM items
            ORDER BY published DESC, id ASC
            LIMIT ?
        "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Look up one item by row id (detail-view read path).
    pub async fn item(&self, id: i64) -> Result<Option<StoredItem>> {
        let item = sqlx::query_as::<_, StoredItem>(
            r#"
            SELECT id, title, description, link, category, published
            FROM items
            WHERE id = ?
        "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Number of items in the current generation.
    pub async fn count_items(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
