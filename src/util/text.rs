use std::borrow::Cow;

/// Normalizes feed text down to printable characters and whitespace.
///
/// Leading and trailing whitespace is stripped, then every character that
/// is neither whitespace nor printable (i.e. control characters such as
/// NUL, BEL, or escape bytes that survive XML unescaping) is removed.
/// Printable characters and interior whitespace runs are preserved
/// verbatim, so `"A\n\n\nB"` stays `"A\n\n\nB"`.
///
/// Applied to item titles and descriptions at the item boundary; links,
/// categories, and raw dates pass through the parser untouched.
///
/// Returns `Cow::Borrowed` when the input is already normalized, which is
/// the common case for well-behaved feeds.
// TODO: collapse runs of 3+ blank lines in descriptions; some feeds pad
// HTML-stripped summaries with them and they read poorly.
pub fn normalize_printable(s: &str) -> Cow<'_, str> {
    let trimmed = s.trim();

    // Fast path: nothing to strip
    if !trimmed.chars().any(is_stripped) {
        return Cow::Borrowed(trimmed);
    }

    Cow::Owned(trimmed.chars().filter(|c| !is_stripped(*c)).collect())
}

/// A character is stripped when it is a control character that is not
/// also whitespace (tab, newline, and carriage return are whitespace and
/// stay).
fn is_stripped(c: char) -> bool {
    c.is_control() && !c.is_whitespace()
}
