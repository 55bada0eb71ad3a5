//! Ingestion pipeline: parse a feed stream and replace the cache with it.
//!
//! [`Ingestor`] is the seam between the parser and the store. It drives
//! [`FeedParser`] item by item — nothing buffers the full item list, so
//! peak memory stays at one pending item regardless of feed size — and
//! owns the error disposition the cache contract requires:
//!
//! - a clean end of document records the ingestion timestamp and commits;
//! - a malformed document or dead stream commits the items already
//!   stored but leaves the timestamp alone, so the next scheduled
//!   refresh is still due;
//! - an unparseable `pubDate` is counted and logged, never fatal.

use std::io::BufRead;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::feed::{FeedError, FeedParser};
use crate::storage::Database;

/// Errors surfaced by a single ingestion attempt.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Another ingestion against this cache is already in flight.
    /// Attempts are never queued or interleaved; retry after the current
    /// run finishes.
    #[error("an ingestion is already in progress")]
    Busy,

    /// The parse aborted (malformed XML or stream read failure). Items
    /// parsed before the failure are kept; the last-ingested timestamp
    /// was not advanced.
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// The cache could not be updated; the transaction was rolled back.
    #[error("cache update failed: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Outcome of a successful ingestion.
///
/// The timestamp travels in the result instead of hiding in process-wide
/// state: callers that want it durable already have it in the settings
/// table (written inside the ingestion transaction), and callers that
/// schedule refreshes can use the value directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Items stored in the new cache generation.
    pub items_stored: usize,
    /// Items stored with an unparseable `pubDate` (publication time NULL).
    pub soft_failures: usize,
    /// Epoch millis recorded as the last successful ingestion time.
    pub new_timestamp: i64,
}

/// Serialized feed-to-cache ingestion driver.
pub struct Ingestor {
    db: Database,
    // Generation boundary: at most one ingestion in flight per cache
    guard: Mutex<()>,
}

impl Ingestor {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            guard: Mutex::new(()),
        }
    }

    /// Parse `input` as RSS 2.0 and replace the cache generation with its
    /// items.
    ///
    /// The whole replacement — clearing the previous generation, storing
    /// each item, recording the timestamp — runs in one SQLite
    /// transaction, so readers never observe a half-replaced cache and a
    /// crash cannot leave the store emptied or the timestamp advanced
    /// without its data.
    ///
    /// # Errors
    ///
    /// [`IngestError::Busy`] if another ingestion is in flight.
    /// [`IngestError::Feed`] if the XML is malformed or the stream dies
    /// mid-parse; items stored before the failure are committed and the
    /// timestamp is not advanced, so the cache self-heals on the next
    /// successful run.
    /// [`IngestError::Storage`] if the database fails; nothing is
    /// committed.
    pub async fn ingest<R: BufRead>(&self, input: R) -> Result<IngestReport, IngestError> {
        let _running = self.guard.try_lock().map_err(|_| {
            tracing::warn!("rejecting concurrent ingestion attempt");
            IngestError::Busy
        })?;

        let mut cache = self.db.begin_ingestion().await?;
        let mut soft_failures = 0usize;

        for parsed in FeedParser::new(input) {
            match parsed {
                Ok(item) => {
                    if item.published.is_none() {
                        soft_failures += 1;
                    }
                    cache.store(&item).await?;
                }
                Err(e) => {
                    // Keep what we have; the un-advanced timestamp marks
                    // the run as failed for the scheduler
                    let stored = cache.commit().await?;
                    tracing::warn!(
                        error = %e,
                        items_kept = stored,
                        "feed parse aborted, cache generation is partial"
                    );
                    return Err(e.into());
                }
            }
        }

        let now = chrono::Utc::now().timestamp_millis();
        cache.record_ingestion_time(now).await?;
        let items_stored = cache.commit().await?;

        tracing::debug!(
            items = items_stored,
            soft_failures = soft_failures,
            "feed ingested"
        );

        Ok(IngestReport {
            items_stored,
            soft_failures,
            new_timestamp: now,
        })
    }

    /// Handle to the underlying cache, for the read path.
    pub fn database(&self) -> &Database {
        &self.db
    }
}
