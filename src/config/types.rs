use serde::{Deserialize, Serialize};

use crate::reasoning_filter::MarkerPair;

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Base URL of the OpenAI-compatible model backend (e.g. LM Studio or
    /// Ollama), without the /v1 suffix
    pub upstream_url: String,
    /// Model name forwarded to the backend. None lets the backend use
    /// whatever model it has loaded
    pub model: Option<String>,
    /// Token budget per generated reply
    pub max_tokens: u32,
    /// Timeout in seconds for non-streaming upstream requests
    pub request_timeout_secs: u64,
    /// Maximum retained conversation turns (one turn = user + assistant)
    pub history_max_turns: usize,
    /// Number of trailing history messages sent as model context
    pub context_window: usize,
    /// Marker that opens a reasoning span in model output
    pub reasoning_open_tag: String,
    /// Marker that closes a reasoning span in model output
    pub reasoning_close_tag: String,
    /// System prompt prepended to every upstream request (None = none)
    pub system_prompt: Option<String>,
    /// CORS allowed origins (empty = allow any origin)
    pub cors_allowed_origins: Vec<String>,
    /// Log level (None = info)
    pub log_level: Option<String>,
    /// Log directory (None = stdout only)
    pub log_dir: Option<String>,
}

impl GatewayConfig {
    /// Marker pair handed to each per-turn filter instance.
    pub fn marker_pair(&self) -> MarkerPair {
        MarkerPair::new(&self.reasoning_open_tag, &self.reasoning_close_tag)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let markers = MarkerPair::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            upstream_url: "http://127.0.0.1:1234".to_string(),
            model: None,
            max_tokens: 256,
            request_timeout_secs: 30,
            history_max_turns: 20,
            context_window: 8,
            reasoning_open_tag: markers.open,
            reasoning_close_tag: markers.close,
            system_prompt: None,
            cors_allowed_origins: vec![],
            log_level: None,
            log_dir: None,
        }
    }
}
