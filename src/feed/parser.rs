use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use super::date::parse_pub_date;
use crate::util::normalize_printable;

/// Errors that terminate a feed parse.
///
/// Both variants are fatal to the parse sequence: the iterator yields the
/// error once and is exhausted afterwards. Items yielded before the error
/// remain valid. An unparseable `pubDate` is deliberately not represented
/// here — it is a per-item soft failure carried as
/// [`NewsItem::published`]` == None`.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The XML is not well-formed (unexpected token, mismatched or
    /// unclosed tag, truncated document).
    #[error("malformed feed: {0}")]
    Malformed(String),

    /// The underlying byte stream failed mid-read.
    #[error("feed stream read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One news entry, fully formed at its `</item>` boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    /// Item title: trimmed, control characters stripped. Empty when the
    /// feed omits `<title>`.
    pub title: String,
    /// Item body text, same normalization as `title`. Empty when absent,
    /// never an `Option`.
    pub description: String,
    /// Link URL, passed through unvalidated and unmodified.
    pub link: String,
    /// Free-text category label, passed through unmodified.
    pub category: String,
    /// Publication time in epoch milliseconds. `None` when `pubDate` was
    /// missing or did not match the RFC 822 layout; the storage layer
    /// persists that as SQL `NULL`, never as a fabricated date.
    pub published: Option<i64>,
}

/// Which item field the parser is currently inside.
///
/// A single-valued state replaces the original five independent
/// "currently parsing tag X" booleans, so two fields can never be open at
/// once and there is no priority order to get wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum CurrentField {
    #[default]
    None,
    Title,
    Description,
    Link,
    Category,
    PubDate,
}

/// Raw field text accumulated for the `<item>` being parsed.
#[derive(Debug, Default)]
struct PendingItem {
    title: String,
    description: String,
    link: String,
    category: String,
    pub_date: String,
}

impl PendingItem {
    /// Applies normalization and date parsing, consuming the pending
    /// state. Only called at an `</item>` boundary, so partially parsed
    /// fields never escape.
    fn finalize(self) -> NewsItem {
        let published = if self.pub_date.is_empty() {
            None
        } else {
            let parsed = parse_pub_date(&self.pub_date);
            if parsed.is_none() {
                tracing::warn!(raw = %self.pub_date, "unparseable pubDate, publication time left unset");
            }
            parsed
        };

        NewsItem {
            title: normalize_printable(&self.title).into_owned(),
            description: normalize_printable(&self.description).into_owned(),
            link: self.link,
            category: self.category,
            published,
        }
    }
}

/// Streaming RSS 2.0 parser.
///
/// Wraps a byte stream in a quick-xml pull reader and yields one
/// [`NewsItem`] per `<item>` element, in document order, as an
/// `Iterator<Item = Result<NewsItem, FeedError>>`. The document is
/// consumed incrementally — peak memory is one pending item regardless of
/// feed size — and the sequence is single-pass: once [`FeedError`] or the
/// end of the document is reached, the iterator stays exhausted.
///
/// Field tracking is scoped to `<item>` elements. Channel-level tags
/// (`<title>`, `<link>`, `<description>` on `<channel>` itself) share
/// names with item fields but describe the feed, not a news entry, and
/// are ignored; without that scope the channel title would bleed into the
/// first item whenever it omits its own.
pub struct FeedParser<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    state: ParserState,
    done: bool,
}

/// Mutable parse state, kept apart from the reader so event handlers can
/// run while the event still borrows the read buffer.
#[derive(Default)]
struct ParserState {
    in_item: bool,
    field: CurrentField,
    pending: PendingItem,
}

impl<R: BufRead> FeedParser<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        // Whitespace-only text nodes between elements carry no field data
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            state: ParserState::default(),
            done: false,
        }
    }

    fn classify(err: quick_xml::Error) -> FeedError {
        match err {
            quick_xml::Error::Io(e) => {
                FeedError::Io(std::io::Error::new(e.kind(), e.to_string()))
            }
            other => FeedError::Malformed(other.to_string()),
        }
    }
}

impl ParserState {
    fn on_start(&mut self, local_name: &[u8]) {
        if !self.in_item {
            if local_name == b"item" {
                self.in_item = true;
                self.field = CurrentField::None;
                self.pending = PendingItem::default();
            }
            return;
        }

        // Tag names are case-sensitive per the RSS 2.0 element names
        self.field = match local_name {
            b"title" => CurrentField::Title,
            b"description" => CurrentField::Description,
            b"link" => CurrentField::Link,
            b"category" => CurrentField::Category,
            b"pubDate" => CurrentField::PubDate,
            _ => CurrentField::None,
        };
    }

    fn on_text(&mut self, text: &str) {
        let text = text.trim();
        // Overwrite, not append: the last text node inside the tag wins,
        // matching the per-item overwrite contract
        match self.field {
            CurrentField::None => {}
            CurrentField::Title => self.pending.title = text.to_string(),
            CurrentField::Description => self.pending.description = text.to_string(),
            CurrentField::Link => self.pending.link = text.to_string(),
            CurrentField::Category => self.pending.category = text.to_string(),
            CurrentField::PubDate => self.pending.pub_date = text.to_string(),
        }
    }

    fn on_end(&mut self, local_name: &[u8]) -> Option<NewsItem> {
        if !self.in_item {
            return None;
        }
        if local_name == b"item" {
            self.in_item = false;
            self.field = CurrentField::None;
            return Some(std::mem::take(&mut self.pending).finalize());
        }
        self.field = CurrentField::None;
        None
    }
}

impl<R: BufRead> Iterator for FeedParser<R> {
    type Item = Result<NewsItem, FeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => self.state.on_start(e.local_name().as_ref()),
                Ok(Event::Text(t)) => match t.unescape() {
                    Ok(text) => self.state.on_text(&text),
                    Err(e) => {
                        // Unresolvable entity references and bad escapes
                        // are well-formedness failures, not IO
                        self.done = true;
                        return Some(Err(FeedError::Malformed(e.to_string())));
                    }
                },
                Ok(Event::CData(t)) => match self.reader.decoder().decode(&t) {
                    Ok(text) => self.state.on_text(&text),
                    Err(e) => {
                        self.done = true;
                        return Some(Err(FeedError::Malformed(e.to_string())));
                    }
                },
                Ok(Event::End(e)) => {
                    if let Some(item) = self.state.on_end(e.local_name().as_ref()) {
                        return Some(Ok(item));
                    }
                }
                Ok(Event::Eof) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(Self::classify(e)));
                }
            }
        }
    }
}
