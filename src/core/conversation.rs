//! In-memory conversation store for one (session, character) pair.

use super::message::Message;

/// Append-only list of messages, replayed in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Appends a completed turn: the user message, then the reply.
    pub fn record_turn(&mut self, utterance: impl Into<String>, reply: impl Into<String>) {
        self.messages.reserve(2);
        self.messages.push(Message::user(utterance));
        self.messages.push(Message::assistant(reply));
    }

    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
