// Client for the OpenAI-compatible model backend. Produces the chunk
// sequence the reasoning filter consumes; all network I/O for a generation
// turn lives here, never in the filter itself.

use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::{
    config::GatewayConfig,
    protocols::{ChatMessage, CompletionChunk, CompletionRequest, CompletionResponse},
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const CHECK_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(StatusCode),

    #[error("upstream response contained no choices")]
    EmptyResponse,
}

impl UpstreamError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Request(e) if e.is_timeout())
    }

    pub fn is_connect(&self) -> bool {
        matches!(self, UpstreamError::Request(e) if e.is_connect())
    }
}

/// Handle to the generation backend. Cheap to clone; one per app context.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
    model: Option<String>,
    max_tokens: u32,
    request_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: config.upstream_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Reachability probe against the backend's model listing.
    pub async fn check(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        match self.client.get(&url).timeout(CHECK_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("upstream check failed: {e}");
                false
            }
        }
    }

    /// One non-streaming completion; returns the raw content of choice 0.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, UpstreamError> {
        let body = CompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            max_tokens: self.max_tokens,
            stream: false,
        };
        let response = self
            .client
            .post(self.completions_url())
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status()));
        }
        let completion: CompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(UpstreamError::EmptyResponse)
    }

    /// Start a streaming completion and return the ordered sequence of
    /// content deltas. The stream ends at the backend's `[DONE]` sentinel or
    /// at the first transport error, which is forwarded rather than masked.
    pub fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
    ) -> UnboundedReceiverStream<Result<String, UpstreamError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let url = self.completions_url();
        let body = CompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            stream: true,
        };

        tokio::spawn(async move {
            let response = match client.post(&url).json(&body).send().await {
                Ok(response) => response,
                Err(e) => {
                    let _ = tx.send(Err(e.into()));
                    return;
                }
            };
            if !response.status().is_success() {
                let _ = tx.send(Err(UpstreamError::Status(response.status())));
                return;
            }

            let mut bytes = response.bytes_stream();
            let mut buffer = BytesMut::new();
            while let Some(item) = bytes.next().await {
                let chunk = match item {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(e.into()));
                        return;
                    }
                };
                buffer.extend_from_slice(&chunk);

                while let Some(line) = take_line(&mut buffer) {
                    match parse_sse_line(&line) {
                        SseLine::Delta(text) => {
                            if tx.send(Ok(text)).is_err() {
                                // Consumer went away; stop reading.
                                return;
                            }
                        }
                        SseLine::Done => return,
                        SseLine::Skip => {}
                    }
                }
            }
        });

        UnboundedReceiverStream::new(rx)
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

/// Pop one complete line off the buffer, or None if no newline has arrived
/// yet. Splitting on the newline byte keeps multi-byte characters intact
/// even when the transport fragments them across reads.
fn take_line(buffer: &mut BytesMut) -> Option<String> {
    let pos = buffer.iter().position(|&b| b == b'\n')?;
    let line = buffer.split_to(pos + 1);
    match std::str::from_utf8(&line[..pos]) {
        Ok(s) => Some(s.trim_end_matches('\r').to_string()),
        Err(e) => {
            warn!("dropping non-UTF-8 SSE line: {e}");
            Some(String::new())
        }
    }
}

#[derive(Debug, PartialEq)]
enum SseLine {
    /// A content delta to forward.
    Delta(String),
    /// The `[DONE]` sentinel.
    Done,
    /// Comments, blank keep-alive lines, empty deltas, or undecodable data.
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(data) = line.strip_prefix("data: ") else {
        return SseLine::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Done;
    }
    let chunk: CompletionChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            warn!("undecodable SSE chunk: {e}");
            return SseLine::Skip;
        }
    };
    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .unwrap_or_default();
    if text.is_empty() {
        SseLine::Skip
    } else {
        SseLine::Delta(text)
    }
}
