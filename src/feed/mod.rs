//! Feed module: streaming RSS 2.0 parsing.
//!
//! The entry point is [`FeedParser`], an iterator that consumes an XML
//! byte stream incrementally and yields one [`NewsItem`] per `<item>`
//! element, in document order. The whole document is never buffered, so
//! feeds of any size parse in constant memory.
//!
//! Date handling lives in [`date`]: RSS `pubDate` strings use the RFC 822
//! layout (`"Tue, 3 Jun 2008 11:05:30 GMT"`), and an unparseable date is
//! a per-item soft failure, not a parse abort.

mod date;
mod parser;

pub use date::parse_pub_date;
pub use parser::{FeedError, FeedParser, NewsItem};
