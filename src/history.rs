// Bounded in-memory conversation log. One logical conversation per process,
// owned by the app context and mutated only under its lock.

use crate::protocols::ChatMessage;

/// Conversation history with a bounded number of retained turns.
///
/// A turn is one user/assistant exchange, so at most `2 * max_turns`
/// messages are kept; older messages are dropped oldest-first.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    entries: Vec<ChatMessage>,
    max_turns: usize,
}

impl ConversationHistory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_turns,
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::assistant(content));
    }

    fn push(&mut self, message: ChatMessage) {
        self.entries.push(message);
        let cap = self.max_turns * 2;
        if self.entries.len() > cap {
            let excess = self.entries.len() - cap;
            self.entries.drain(..excess);
        }
    }

    /// The trailing `n` messages, used as the model context window.
    pub fn recent(&self, n: usize) -> &[ChatMessage] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.entries.clone()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
