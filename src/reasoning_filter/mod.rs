// Detection and removal of reasoning spans (e.g. <think>...</think>) from
// model output, both incrementally over a token stream and over whole
// completions.

mod canonical;
mod streaming;

pub use canonical::{canonicalize, normalize_whitespace};
pub use streaming::{FilterMode, StreamingFilter};

/// The pair of marker strings delimiting a reasoning span.
///
/// Immutable for the lifetime of a stream; cloned into each per-turn filter
/// instance at turn start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPair {
    /// Marker that opens a reasoning span.
    pub open: String,
    /// Marker that closes a reasoning span.
    pub close: String,
}

impl MarkerPair {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

impl Default for MarkerPair {
    fn default() -> Self {
        Self {
            open: "<think>".to_string(),
            close: "</think>".to_string(),
        }
    }
}
