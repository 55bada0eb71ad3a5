//! Integration tests for the ingestion lifecycle: parse, replace, record.
//!
//! Each test creates its own in-memory SQLite database for isolation.
//! These tests exercise the pipeline end-to-end — parser, ingestion
//! transaction, settings clock — verifying the cache is always a pure
//! mirror of the most recent parse.

use std::io::{BufRead, Read};

use pretty_assertions::assert_eq;

use feedmirror::{Database, FeedError, IngestError, Ingestor};

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Campus News</title>
    <link>https://example.edu/</link>
    <item>
      <title>First</title>
      <description>Body one</description>
      <link>https://example.edu/1</link>
      <category>Events</category>
      <pubDate>Tue, 3 Jun 2008 11:05:30 GMT</pubDate>
    </item>
    <item>
      <title>Second</title>
      <description>Body two</description>
      <link>https://example.edu/2</link>
      <category>Grants</category>
      <pubDate>Wed, 4 Jun 2008 09:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Third</title>
      <description>Body three</description>
      <link>https://example.edu/3</link>
      <category>Events</category>
      <pubDate>Thu, 5 Jun 2008 08:30:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

// ============================================================================
// Happy Path
// ============================================================================

#[tokio::test]
async fn test_ingest_stores_all_items_and_records_timestamp() {
    let db = test_db().await;
    let ingestor = Ingestor::new(db.clone());

    let report = ingestor.ingest(FEED.as_bytes()).await.unwrap();
    assert_eq!(report.items_stored, 3);
    assert_eq!(report.soft_failures, 0);

    assert_eq!(db.count_items().await.unwrap(), 3);
    assert_eq!(db.last_ingested().await.unwrap(), Some(report.new_timestamp));
}

#[tokio::test]
async fn test_read_path_orders_newest_first() {
    let db = test_db().await;
    Ingestor::new(db.clone())
        .ingest(FEED.as_bytes())
        .await
        .unwrap();

    let items = db.items(None).await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].title, "Third");
    assert_eq!(items[1].title, "Second");
    assert_eq!(items[2].title, "First");
    assert_eq!(items[2].published, Some(1_212_491_130_000));
}

#[tokio::test]
async fn test_empty_channel_yields_empty_generation() {
    let db = test_db().await;
    let report = Ingestor::new(db.clone())
        .ingest(r#"<rss><channel><title>Quiet</title></channel></rss>"#.as_bytes())
        .await
        .unwrap();

    assert_eq!(report.items_stored, 0);
    assert_eq!(db.count_items().await.unwrap(), 0);
    // An empty feed is still a successful run; the clock advances
    assert_eq!(db.last_ingested().await.unwrap(), Some(report.new_timestamp));
}

// ============================================================================
// Idempotence / Replacement
// ============================================================================

#[tokio::test]
async fn test_reingest_replaces_rather_than_accumulates() {
    let db = test_db().await;
    let ingestor = Ingestor::new(db.clone());

    let first = ingestor.ingest(FEED.as_bytes()).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = ingestor.ingest(FEED.as_bytes()).await.unwrap();

    // Exactly the second parse's items, no duplication from the first run
    assert_eq!(db.count_items().await.unwrap(), 3);
    assert!(second.new_timestamp > first.new_timestamp);
    assert_eq!(db.last_ingested().await.unwrap(), Some(second.new_timestamp));
}

#[tokio::test]
async fn test_reingest_with_smaller_feed_shrinks_cache() {
    let db = test_db().await;
    let ingestor = Ingestor::new(db.clone());

    ingestor.ingest(FEED.as_bytes()).await.unwrap();

    let one_item = r#"<rss><channel><item><title>Only</title></item></channel></rss>"#;
    ingestor.ingest(one_item.as_bytes()).await.unwrap();

    let items = db.items(None).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Only");
}

// ============================================================================
// Soft Failures (per-item)
// ============================================================================

#[tokio::test]
async fn test_unparseable_pub_date_stored_with_null_timestamp() {
    let db = test_db().await;

    let feed = r#"<rss><channel>
      <item><title>Dated</title><pubDate>Tue, 3 Jun 2008 11:05:30 GMT</pubDate></item>
      <item><title>Undated</title><pubDate>not-a-date</pubDate></item>
    </channel></rss>"#;

    let report = Ingestor::new(db.clone())
        .ingest(feed.as_bytes())
        .await
        .unwrap();

    // The malformed date did not abort the batch
    assert_eq!(report.items_stored, 2);
    assert_eq!(report.soft_failures, 1);

    let items = db.items(None).await.unwrap();
    assert_eq!(items[0].title, "Dated");
    assert_eq!(items[1].title, "Undated");
    assert_eq!(items[1].published, None);
}

#[tokio::test]
async fn test_missing_description_stored_as_empty_string() {
    let db = test_db().await;

    let feed = r#"<rss><channel><item><title>Terse</title></item></channel></rss>"#;
    Ingestor::new(db.clone())
        .ingest(feed.as_bytes())
        .await
        .unwrap();

    let items = db.items(None).await.unwrap();
    assert_eq!(items[0].description, "");
}

// ============================================================================
// Fatal Failures (whole parse)
// ============================================================================

#[tokio::test]
async fn test_malformed_feed_keeps_partial_generation_and_clock() {
    let db = test_db().await;
    let ingestor = Ingestor::new(db.clone());

    // Establish a successful generation and its timestamp
    let baseline = ingestor.ingest(FEED.as_bytes()).await.unwrap();

    // Three valid items, then the document truncates inside a tag
    let broken = r#"<rss><channel>
      <item><title>A</title></item>
      <item><title>B</title></item>
      <item><title>C</title></item>
      <item><ti"#;

    let err = ingestor.ingest(broken.as_bytes()).await.unwrap_err();
    assert!(matches!(err, IngestError::Feed(FeedError::Malformed(_))));

    // The partial generation replaced the old one...
    let items = db.items(None).await.unwrap();
    assert_eq!(items.len(), 3);
    let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
    assert!(titles.contains(&"A") && titles.contains(&"B") && titles.contains(&"C"));

    // ...but the clock did not advance, so the next refresh is still due
    assert_eq!(
        db.last_ingested().await.unwrap(),
        Some(baseline.new_timestamp)
    );
}

#[tokio::test]
async fn test_malformed_feed_on_fresh_cache_leaves_clock_unset() {
    let db = test_db().await;

    let err = Ingestor::new(db.clone())
        .ingest("<rss><channel><item><ti".as_bytes())
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Feed(FeedError::Malformed(_))));
    assert_eq!(db.last_ingested().await.unwrap(), None);
}

// ============================================================================
// Serialization of Ingestion Attempts
// ============================================================================

/// A reader that signals when the first read arrives, then blocks until
/// released. Lets a test hold one ingestion mid-parse deterministically.
struct GatedReader {
    started: Option<tokio::sync::oneshot::Sender<()>>,
    release: std::sync::mpsc::Receiver<()>,
    data: &'static [u8],
    pos: usize,
}

impl Read for GatedReader {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        let n;
        {
            let available = self.fill_buf()?;
            n = available.len().min(out.len());
            out[..n].copy_from_slice(&available[..n]);
        }
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for GatedReader {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        if let Some(tx) = self.started.take() {
            let _ = tx.send(());
            // Block this worker thread until the test releases us
            let _ = self.release.recv();
        }
        Ok(&self.data[self.pos..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos += amt;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_concurrent_ingest_is_rejected() {
    let db = test_db().await;
    let ingestor = std::sync::Arc::new(Ingestor::new(db.clone()));

    let (started_tx, started_rx) = tokio::sync::oneshot::channel();
    let (release_tx, release_rx) = std::sync::mpsc::channel();

    let reader = GatedReader {
        started: Some(started_tx),
        release: release_rx,
        data: FEED.as_bytes(),
        pos: 0,
    };

    let first = {
        let ingestor = ingestor.clone();
        tokio::spawn(async move { ingestor.ingest(reader).await })
    };

    // The first ingestion holds the generation guard once its parse began
    started_rx.await.unwrap();

    let second = ingestor.ingest(FEED.as_bytes()).await;
    assert!(matches!(second, Err(IngestError::Busy)));

    release_tx.send(()).unwrap();
    let report = first.await.unwrap().unwrap();
    assert_eq!(report.items_stored, 3);

    // The rejected attempt left no trace
    assert_eq!(db.count_items().await.unwrap(), 3);
}

// ============================================================================
// Stream Failures
// ============================================================================

#[tokio::test]
async fn test_dead_stream_surfaces_io_error() {
    struct DeadReader;

    impl Read for DeadReader {
        fn read(&mut self, _out: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "read timed out",
            ))
        }
    }

    impl BufRead for DeadReader {
        fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
            Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "read timed out",
            ))
        }
        fn consume(&mut self, _amt: usize) {}
    }

    let db = test_db().await;
    let err = Ingestor::new(db.clone())
        .ingest(DeadReader)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Feed(FeedError::Io(_))));
    assert_eq!(db.last_ingested().await.unwrap(), None);
}
