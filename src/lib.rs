//! feedmirror — a local mirror of a remote RSS feed.
//!
//! The crate is the ingestion core only: it consumes an RSS 2.0 byte
//! stream that the embedding application already fetched, parses it
//! incrementally into [`feed::NewsItem`] records, and atomically replaces
//! a SQLite-backed cache with the new generation, recording the time of
//! the last successful run.
//!
//! Fetching the bytes, scheduling refreshes, and displaying the cached
//! items are the embedder's job. The usual shape is:
//!
//! ```ignore
//! let db = Database::open("rss.db").await?;
//! let ingestor = Ingestor::new(db.clone());
//!
//! // `reader` is any BufRead over the feed bytes.
//! let report = ingestor.ingest(reader).await?;
//! tracing::info!(items = report.items_stored, "feed refreshed");
//!
//! // Display side, later:
//! let items = db.items(None).await?;
//! ```

pub mod feed;
pub mod ingest;
pub mod storage;
pub mod util;

pub use feed::{FeedError, FeedParser, NewsItem};
pub use ingest::{IngestError, IngestReport, Ingestor};
pub use storage::{Database, DatabaseError, StoredItem};
