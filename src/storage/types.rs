use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process has the cache database locked
    #[error("the cache database is locked by another process")]
    Locked,

    /// Migration failed
    #[error("database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLite lock-related error messages:
        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return DatabaseError::Locked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// One cached news item as read back for display.
///
/// The row id is auto-assigned at insert; insertion order within a
/// generation is document order, so ids also reflect the feed's own
/// ordering when `published` ties or is NULL.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub link: String,
    pub category: String,
    /// Epoch milliseconds; `None` marks an item whose `pubDate` did not
    /// parse. Kept distinguishable from every real timestamp instead of
    /// being coerced to a sentinel date.
    pub published: Option<i64>,
}
