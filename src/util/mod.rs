//! Small shared helpers with no dependencies on the rest of the crate.

mod text;

pub use text::normalize_printable;
