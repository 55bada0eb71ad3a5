//! SQLite-backed cache of the most recent feed generation.
//!
//! The cache is a pure mirror: each ingestion replaces the previous
//! generation wholesale inside one transaction ([`IngestionTx`]), and a
//! durable settings table records when the last successful run finished.
//! Between ingestions the store is read-only.

mod items;
mod schema;
mod settings;
mod types;

pub use items::IngestionTx;
pub use schema::Database;
pub use settings::LAST_INGESTED_KEY;
pub use types::{DatabaseError, StoredItem};
