use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::message::{new_message_id, Message};

/// An ordered transcript plus the bookkeeping the history list sorts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: new_message_id(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|msg| msg.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|msg| msg.id == id)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Text of the most recent user message, used when regenerating.
    pub fn last_user_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|msg| msg.is_user())
            .map(|msg| msg.content.clone())
    }

    /// First line of the first user message, for history listings.
    pub fn preview(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|msg| msg.is_user())
            .and_then(|msg| msg.content.lines().next())
    }

    /// Regeneration needs an assistant reply at the tail and something before it.
    pub fn can_regenerate(&self) -> bool {
        self.messages.len() >= 2 && self.last_message().is_some_and(Message::is_assistant)
    }

    pub fn replace_content(&mut self, id: &str, content: impl Into<String>) -> bool {
        match self.messages.iter_mut().find(|msg| msg.id == id) {
            Some(msg) => {
                msg.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn remove_message(&mut self, id: &str) -> Option<Message> {
        let index = self.position(id)?;
        Some(self.messages.remove(index))
    }

    /// Removes the message with `id`. A user message takes its directly
    /// following assistant reply with it. Returns the removed messages.
    pub fn delete_message(&mut self, id: &str) -> Vec<Message> {
        let Some(index) = self.position(id) else {
            return Vec::new();
        };

        let takes_reply = self.messages[index].is_user()
            && self
                .messages
                .get(index + 1)
                .is_some_and(Message::is_assistant);
        let end = if takes_reply { index + 2 } else { index + 1 };
        self.messages.drain(index..end).collect()
    }

    /// Drops the trailing message if it is an assistant reply.
    pub fn pop_trailing_assistant(&mut self) -> Option<Message> {
        if self.last_message().is_some_and(Message::is_assistant) {
            self.messages.pop()
        } else {
            None
        }
    }
}
