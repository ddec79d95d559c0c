// Request/response types for the gateway's own API and for the
// OpenAI-compatible upstream backend.

use serde::{Deserialize, Serialize};

/// One message of a conversation, in the shape the upstream chat-completions
/// endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat` and `POST /api/stream_chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Body of the non-streaming chat response.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<ChatMessage>,
}

/// Payloads of the SSE events emitted by the streaming chat route.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Token { token: String },
    Done { done: bool, full_text: String },
    Error { error: String },
}

impl StreamEvent {
    pub fn token(token: impl Into<String>) -> Self {
        StreamEvent::Token {
            token: token.into(),
        }
    }

    pub fn done(full_text: impl Into<String>) -> Self {
        StreamEvent::Done {
            done: true,
            full_text: full_text.into(),
        }
    }

    pub fn error(error: impl std::fmt::Display) -> Self {
        StreamEvent::Error {
            error: error.to_string(),
        }
    }
}

/// Request body for the upstream `/v1/chat/completions` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub stream: bool,
}

/// Non-streaming upstream response; only the fields the gateway reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChoice {
    pub message: ChatMessage,
}

/// One decoded SSE chunk of a streaming upstream response.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}
