// Incremental filter that suppresses reasoning spans in streamed model
// output. Chunk boundaries are arbitrary: a marker may arrive split across
// any number of chunks, so text that could still become a marker is held
// back rather than emitted.

use crate::reasoning_filter::MarkerPair;

/// Whether text currently being accumulated is destined for the consumer or
/// lies inside a reasoning span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Visible,
    Suppressed,
}

/// Streaming reasoning-span filter.
///
/// One instance per generation turn. Feed chunks with [`process_chunk`] as
/// they arrive; each call returns the text that is safe to forward
/// immediately (possibly empty). Call [`finish`] exactly once when the
/// source signals end-of-stream to flush the residual buffer.
///
/// Forwarded text never contains a partial marker, and the concatenation of
/// everything returned is independent of how the underlying text was split
/// into chunks.
///
/// [`process_chunk`]: StreamingFilter::process_chunk
/// [`finish`]: StreamingFilter::finish
#[derive(Debug, Clone)]
pub struct StreamingFilter {
    markers: MarkerPair,
    mode: FilterMode,
    /// Text received but not yet emitted or discarded. May hold a partial
    /// marker prefix; never holds a complete unprocessed marker.
    pending: String,
    /// Everything emitted to the consumer so far this turn.
    visible: String,
}

impl StreamingFilter {
    pub fn new(markers: MarkerPair) -> Self {
        Self {
            markers,
            mode: FilterMode::Visible,
            pending: String::new(),
            visible: String::new(),
        }
    }

    /// Process one arriving chunk and return the text confirmed visible by
    /// it, in arrival order. Suppressed content and marker text are never
    /// part of the return value.
    pub fn process_chunk(&mut self, chunk: &str) -> String {
        self.pending.push_str(chunk);
        self.drain()
    }

    /// End-of-stream flush.
    ///
    /// Outside a reasoning span the whole residual buffer is emitted: a
    /// held-back prefix that never completed into a marker is real text.
    /// Inside a span the buffer is discarded; an unterminated span yields
    /// nothing (discard-to-end).
    pub fn finish(&mut self) -> String {
        match self.mode {
            FilterMode::Visible => {
                let tail = std::mem::take(&mut self.pending);
                self.visible.push_str(&tail);
                tail
            }
            FilterMode::Suppressed => {
                self.pending.clear();
                String::new()
            }
        }
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Full concatenation of all fragments emitted this turn, for the final
    /// history record.
    pub fn visible_text(&self) -> &str {
        &self.visible
    }

    pub fn into_visible_text(self) -> String {
        self.visible
    }

    /// Resolve every complete marker currently in `pending`, then emit what
    /// is confirmed visible. All markers contained in one chunk are handled
    /// within the same call.
    fn drain(&mut self) -> String {
        let mut emitted = String::new();

        loop {
            match self.mode {
                FilterMode::Visible => {
                    if let Some(pos) = self.pending.find(&self.markers.open) {
                        emitted.push_str(&self.pending[..pos]);
                        self.pending.drain(..pos + self.markers.open.len());
                        self.mode = FilterMode::Suppressed;
                    } else {
                        // Hold back only the trailing bytes that could still
                        // grow into an opening marker; the rest is confirmed.
                        let hold = partial_marker_len(&self.pending, &self.markers.open);
                        let cut = self.pending.len() - hold;
                        emitted.push_str(&self.pending[..cut]);
                        self.pending.drain(..cut);
                        break;
                    }
                }
                FilterMode::Suppressed => {
                    if let Some(pos) = self.pending.find(&self.markers.close) {
                        self.pending.drain(..pos + self.markers.close.len());
                        self.mode = FilterMode::Visible;
                    } else {
                        // Span content is never emitted under any policy, so
                        // only a possible partial closing marker needs to
                        // survive until the next chunk.
                        let hold = partial_marker_len(&self.pending, &self.markers.close);
                        let cut = self.pending.len() - hold;
                        self.pending.drain(..cut);
                        break;
                    }
                }
            }
        }

        self.visible.push_str(&emitted);
        emitted
    }
}

/// Length of the longest suffix of `pending` that is a proper prefix of
/// `marker`, i.e. the bytes that could still complete into the marker once
/// more text arrives. Returns 0 when no suffix can.
fn partial_marker_len(pending: &str, marker: &str) -> usize {
    let max = pending.len().min(marker.len().saturating_sub(1));
    for k in (1..=max).rev() {
        if marker.is_char_boundary(k) && pending.ends_with(&marker[..k]) {
            return k;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(chunks: &[&str]) -> (String, String) {
        let mut filter = StreamingFilter::new(MarkerPair::default());
        let mut out = String::new();
        for chunk in chunks {
            out.push_str(&filter.process_chunk(chunk));
        }
        out.push_str(&filter.finish());
        let visible = filter.into_visible_text();
        (out, visible)
    }

    #[test]
    fn passthrough_without_markers() {
        let (out, visible) = run(&["Hello", " ", "world"]);
        assert_eq!(out, "Hello world");
        assert_eq!(visible, "Hello world");
    }

    #[test]
    fn strips_single_span() {
        let (out, _) = run(&["<think>internal</think>Hello"]);
        assert_eq!(out, "Hello");
    }

    #[test]
    fn strips_multiple_spans_in_one_chunk() {
        let (out, _) = run(&["A<think>1</think>B<think>2</think>C"]);
        assert_eq!(out, "ABC");
    }

    #[test]
    fn marker_split_across_chunks() {
        let (out, _) = run(&["<th", "ink>x</thi", "nk>Hello"]);
        assert_eq!(out, "Hello");
    }

    #[test]
    fn emitted_text_is_independent_of_chunking() {
        let text = "<think>x</think>Hello";
        let whole = run(&[text]).0;
        let by_char: Vec<String> = text.chars().map(|c| c.to_string()).collect();
        let refs: Vec<&str> = by_char.iter().map(|s| s.as_str()).collect();
        assert_eq!(run(&refs).0, whole);
        assert_eq!(run(&["<th", "ink>x</thi", "nk>Hello"]).0, whole);
        assert_eq!(whole, "Hello");
    }

    #[test]
    fn all_segmentations_agree() {
        // Every way of splitting the text into consecutive non-empty chunks
        // must yield the same emitted concatenation.
        let text = "a<think>b</thi";
        let n = text.len();
        let expected = run(&[text]).0;
        assert_eq!(expected, "a");
        for mask in 0..(1u32 << (n - 1)) {
            let mut chunks = Vec::new();
            let mut start = 0;
            for i in 0..n {
                if i + 1 == n || mask & (1 << i) != 0 {
                    chunks.push(&text[start..=i]);
                    start = i + 1;
                }
            }
            assert_eq!(run(&chunks).0, expected, "segmentation mask {mask:#b}");
        }
    }

    #[test]
    fn all_two_and_three_part_splits_agree() {
        let text = "A<think>1</think>B<think>2</think>C tail";
        let expected = run(&[text]).0;
        assert_eq!(expected, "ABC tail");
        for i in 1..text.len() {
            assert_eq!(run(&[&text[..i], &text[i..]]).0, expected, "split at {i}");
            for j in i + 1..text.len() {
                assert_eq!(
                    run(&[&text[..i], &text[i..j], &text[j..]]).0,
                    expected,
                    "splits at {i},{j}"
                );
            }
        }
    }

    #[test]
    fn no_partial_marker_is_ever_emitted() {
        let mut filter = StreamingFilter::new(MarkerPair::default());
        assert_eq!(filter.process_chunk("Hello <thi"), "Hello ");
        assert_eq!(filter.mode(), FilterMode::Visible);
        // The held prefix completes into a real marker.
        assert_eq!(filter.process_chunk("nk>secret</think> world"), " world");
        assert_eq!(filter.finish(), "");
        assert_eq!(filter.visible_text(), "Hello  world");
    }

    #[test]
    fn held_prefix_that_was_not_a_marker_is_released() {
        let mut filter = StreamingFilter::new(MarkerPair::default());
        assert_eq!(filter.process_chunk("x<th"), "x");
        assert_eq!(filter.process_chunk("at is fine"), "<that is fine");
        assert_eq!(filter.finish(), "");
    }

    #[test]
    fn held_prefix_flushes_at_end_of_stream() {
        let mut filter = StreamingFilter::new(MarkerPair::default());
        assert_eq!(filter.process_chunk("Hello <thi"), "Hello ");
        assert_eq!(filter.finish(), "<thi");
        assert_eq!(filter.visible_text(), "Hello <thi");
    }

    #[test]
    fn unterminated_span_is_discarded() {
        let (out, visible) = run(&["<think>abc"]);
        assert_eq!(out, "");
        assert_eq!(visible, "");
    }

    #[test]
    fn unterminated_span_after_visible_text() {
        let (out, _) = run(&["Hello <think>never closed"]);
        assert_eq!(out, "Hello ");
    }

    #[test]
    fn unmatched_close_is_ordinary_text() {
        let (out, _) = run(&["no span </think> here"]);
        assert_eq!(out, "no span </think> here");
    }

    #[test]
    fn unmatched_close_split_across_chunks() {
        let (out, _) = run(&["</", "answer"]);
        assert_eq!(out, "</answer");
    }

    #[test]
    fn suppressed_mode_emits_nothing() {
        let mut filter = StreamingFilter::new(MarkerPair::default());
        filter.process_chunk("<think>");
        assert_eq!(filter.mode(), FilterMode::Suppressed);
        assert_eq!(filter.process_chunk("long internal deliberation "), "");
        assert_eq!(filter.process_chunk("spanning many chunks"), "");
        assert_eq!(filter.visible_text(), "");
    }

    #[test]
    fn suppressed_buffer_stays_bounded() {
        let markers = MarkerPair::default();
        let mut filter = StreamingFilter::new(markers.clone());
        filter.process_chunk("<think>");
        for _ in 0..1000 {
            filter.process_chunk("reasoning reasoning reasoning ");
        }
        assert!(filter.pending.len() < markers.close.len());
        assert_eq!(filter.process_chunk("</think>done"), "done");
    }

    #[test]
    fn span_ending_exactly_at_chunk_boundary() {
        let (out, _) = run(&["<think>x</think>", "Hello"]);
        assert_eq!(out, "Hello");
    }

    #[test]
    fn adjacent_spans_across_boundaries() {
        let (out, _) = run(&["A<think>1</thi", "nk><think>2</think>B"]);
        assert_eq!(out, "AB");
    }

    #[test]
    fn visible_accumulator_matches_emissions() {
        let mut filter = StreamingFilter::new(MarkerPair::default());
        let mut out = String::new();
        for chunk in ["Hel", "lo <think>x", "</think> the", "re"] {
            out.push_str(&filter.process_chunk(chunk));
        }
        out.push_str(&filter.finish());
        assert_eq!(filter.visible_text(), out);
        assert_eq!(out, "Hello  there");
    }

    #[test]
    fn custom_markers() {
        let markers = MarkerPair::new("[[reason]]", "[[/reason]]");
        let mut filter = StreamingFilter::new(markers);
        let mut out = String::new();
        for chunk in ["a[[rea", "son]]hidden[[/re", "ason]]b"] {
            out.push_str(&filter.process_chunk(chunk));
        }
        out.push_str(&filter.finish());
        assert_eq!(out, "ab");
    }

    #[test]
    fn partial_marker_len_prefers_longest_suffix() {
        assert_eq!(partial_marker_len("abc<thi", "<think>"), 4);
        assert_eq!(partial_marker_len("abc<", "<think>"), 1);
        assert_eq!(partial_marker_len("abc", "<think>"), 0);
        // A full marker is not a partial one.
        assert_eq!(partial_marker_len("<think>", "<think>"), 0);
        assert_eq!(partial_marker_len("x<th<t", "<think>"), 2);
    }
}
