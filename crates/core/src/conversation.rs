//! Conversation-related types.

use app_insight_model::Message;
use serde::{Deserialize, Serialize};

/// The number of most recent messages submitted to the model.
pub const HISTORY_WINDOW: usize = 40;

/// Represents a conversation.
///
/// A conversation is owned by the caller. The agent takes it at the start
/// of a turn and hands back the extended conversation at the end, nothing
/// is kept in between. It serializes as a plain array of messages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all messages in order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if the conversation has no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the last message, if any.
    #[inline]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Appends a message.
    #[inline]
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Returns the most recent `window` messages.
    ///
    /// Older messages are dropped wholesale. Tool results at the head of
    /// the window are dropped too, so every submitted result still follows
    /// the call it answers. The conversation itself is left untouched.
    #[inline]
    pub fn trimmed(&self, window: usize) -> &[Message] {
        &self.messages[self.window_start(window)..]
    }

    #[inline]
    pub(crate) fn window_start(&self, window: usize) -> usize {
        let start = self.messages.len().saturating_sub(window);
        let orphaned = self.messages[start..]
            .iter()
            .take_while(|message| message.has_tool_results())
            .count();
        start + orphaned
    }

    /// Consumes the conversation and returns its messages.
    #[inline]
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl From<Vec<Message>> for Conversation {
    #[inline]
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
