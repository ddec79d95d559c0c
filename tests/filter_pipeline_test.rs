// End-to-end run of a generation turn: an in-memory source feeds chunks
// through a per-turn filter into an ordered sink, mirroring the streaming
// chat path without any network dependency.

use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::UnboundedReceiverStream};

use voicechat_gateway::reasoning_filter::{
    MarkerPair, StreamingFilter, canonicalize, normalize_whitespace,
};

/// Drive one turn and return (ordered sink fragments, accumulated visible text).
async fn run_turn(chunks: Vec<&'static str>) -> (Vec<String>, String) {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        for chunk in chunks {
            if tx.send(chunk.to_string()).is_err() {
                return;
            }
        }
    });

    let mut source = UnboundedReceiverStream::new(rx);
    let mut filter = StreamingFilter::new(MarkerPair::default());
    let mut sink = Vec::new();
    while let Some(chunk) = source.next().await {
        let emitted = filter.process_chunk(&chunk);
        if !emitted.is_empty() {
            sink.push(emitted);
        }
    }
    let tail = filter.finish();
    if !tail.is_empty() {
        sink.push(tail);
    }
    (sink, filter.into_visible_text())
}

#[tokio::test]
async fn turn_filters_reasoning_and_preserves_order() {
    let (sink, visible) = run_turn(vec![
        "Well, ",
        "<think>the user greeted me, ",
        "so I should greet back</think>",
        "hey ",
        "there!",
    ])
    .await;

    assert_eq!(sink.concat(), "Well, hey there!");
    assert_eq!(visible, "Well, hey there!");
    // Fragments arrive in source order, never reordered or coalesced across
    // an emission boundary.
    assert_eq!(sink, vec!["Well, ", "hey ", "there!"]);
}

#[tokio::test]
async fn token_sized_chunks_match_single_chunk_run() {
    let text = "<think>first</think>Sure thing<think>second</think>!";
    let single = run_turn(vec![text]).await.1;

    let token_sized: Vec<&'static str> = text
        .char_indices()
        .map(|(i, c)| &text[i..i + c.len_utf8()])
        .collect();
    let charwise = run_turn(token_sized).await.1;

    assert_eq!(single, charwise);
    assert_eq!(single, "Sure thing!");
}

#[tokio::test]
async fn aborted_reasoning_span_yields_no_output() {
    let (sink, visible) = run_turn(vec!["<think>cut off before the close marker"]).await;
    assert!(sink.is_empty());
    assert!(visible.is_empty());
}

#[tokio::test]
async fn marker_free_turn_is_passed_through_verbatim() {
    let chunks = vec!["All", " good", " here."];
    let (sink, visible) = run_turn(chunks.clone()).await;
    assert_eq!(sink, chunks);
    assert_eq!(visible, "All good here.");
}

#[tokio::test]
async fn finished_turn_survives_canonicalization_unchanged() {
    // After a fully terminated stream the visible text holds no complete
    // span, so the end-of-turn canonicalization pass only normalizes
    // whitespace before the text enters the history.
    let (_, visible) = run_turn(vec![
        "Sounds fun!",
        " <think>keep it short</think>",
        " Tell me more.",
    ])
    .await;

    assert_eq!(
        canonicalize(&visible, &MarkerPair::default()),
        normalize_whitespace(&visible),
    );
}
