use chrono::DateTime;

/// Parses an RSS `pubDate` string into epoch milliseconds.
///
/// RSS 2.0 dates follow RFC 822 (`"EEE, d MMM yyyy HH:mm:ss z"` with
/// English month and weekday names, e.g. `"Tue, 3 Jun 2008 11:05:30
/// GMT"`); chrono's RFC 2822 parser accepts exactly that layout,
/// including one-digit days and the `GMT`/`UT` zone names.
///
/// Returns `None` for anything that deviates from the layout. Callers
/// treat that as a per-item soft failure: the item is still emitted, with
/// its publication time explicitly unset rather than coerced to a
/// plausible-looking date.
pub fn parse_pub_date(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.timestamp_millis())
}
