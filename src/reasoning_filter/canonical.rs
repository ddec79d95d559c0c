// Whole-text removal of reasoning spans, used for non-streaming completions
// and as the end-of-turn pass over the accumulated visible text.

use crate::reasoning_filter::MarkerPair;

/// Remove every fully-matched reasoning span from `text`, then collapse
/// whitespace runs to single spaces and trim.
///
/// Spans are removed leftmost-first and replaced by a single space so that
/// text on either side never fuses into one word. Removal is repeated until
/// a pass changes nothing, which makes the function idempotent even when a
/// removal splices marker fragments into a new complete span.
///
/// An unmatched trailing `open` with no `close` is not a complete span and
/// is left untouched. This intentionally differs from the streaming filter,
/// which discards an unterminated span to the end of the stream.
///
/// Total over any input: text without markers comes back unchanged apart
/// from whitespace normalization.
pub fn canonicalize(text: &str, markers: &MarkerPair) -> String {
    let mut current = text.to_string();
    loop {
        let next = strip_complete_spans(&current, markers);
        if next == current {
            break;
        }
        current = next;
    }
    normalize_whitespace(&current)
}

/// Collapse all whitespace runs (including newlines) to single spaces and
/// trim leading/trailing whitespace.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One left-to-right pass removing each complete `open..close` span,
/// leaving a single space in its place. A trailing `open` with no matching
/// `close` ends the pass with the remainder kept verbatim.
fn strip_complete_spans(text: &str, markers: &MarkerPair) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(&markers.open) {
        let after_open = start + markers.open.len();
        match rest[after_open..].find(&markers.close) {
            Some(rel) => {
                out.push_str(&rest[..start]);
                out.push(' ');
                rest = &rest[after_open + rel + markers.close.len()..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}
