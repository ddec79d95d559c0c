use tokio::sync::RwLock;

use crate::{
    config::GatewayConfig,
    history::ConversationHistory,
    upstream::{UpstreamClient, UpstreamError},
};

/// Shared state handed to every request handler.
///
/// The conversation history is the only mutable piece; it lives behind its
/// own lock so concurrent turns serialize at the sink, not in the filter.
pub struct AppContext {
    pub config: GatewayConfig,
    pub upstream: UpstreamClient,
    pub history: RwLock<ConversationHistory>,
}

impl AppContext {
    pub fn new(config: GatewayConfig) -> Result<Self, UpstreamError> {
        let upstream = UpstreamClient::new(&config)?;
        let history = RwLock::new(ConversationHistory::new(config.history_max_turns));
        Ok(Self {
            config,
            upstream,
            history,
        })
    }
}
