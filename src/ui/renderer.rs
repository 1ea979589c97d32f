use chrono::Local;

use crate::core::conversation::Conversation;
use crate::core::message::Message;

pub const PROMPT: &str = "> ";

/// Tracks what of the streaming reply is already on screen so each
/// full-text update only prints the new tail.
#[derive(Debug, Default)]
pub struct StreamView {
    printed: String,
}

impl StreamView {
    /// Text to print for `content`. When `content` no longer extends what was
    /// printed, the whole reply is printed again on a fresh line.
    pub fn advance(&mut self, content: &str) -> String {
        let delta = match content.strip_prefix(self.printed.as_str()) {
            Some(rest) => rest.to_string(),
            None => format!("\n{content}"),
        };
        self.printed.clear();
        self.printed.push_str(content);
        delta
    }

    pub fn reset(&mut self) {
        self.printed.clear();
    }
}

pub fn reply_prefix() -> String {
    format!("{}: ", crate::core::message::Role::Assistant.label())
}

pub fn render_transcript(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "No messages yet.\n".to_string();
    }

    let mut out = String::new();
    for (index, msg) in messages.iter().enumerate() {
        let content = if msg.content.is_empty() {
            "(no reply)"
        } else {
            msg.content.as_str()
        };
        out.push_str(&format!(
            "[{}] {} {}: {}\n",
            index + 1,
            msg.timestamp.with_timezone(&Local).format("%H:%M"),
            msg.role.label(),
            content
        ));
    }
    out
}

pub fn render_history(conversations: &[Conversation], current_id: Option<&str>) -> String {
    if conversations.is_empty() {
        return "No saved conversations.\n".to_string();
    }

    let mut out = String::new();
    for conversation in conversations {
        let marker = if current_id == Some(conversation.id.as_str()) {
            '*'
        } else {
            ' '
        };
        out.push_str(&format!(
            "{marker} {}  {}  {:>3} msgs  {}\n",
            conversation.short_id(),
            conversation
                .updated_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M"),
            conversation.messages.len(),
            conversation.preview().unwrap_or("(empty)")
        ));
    }
    out
}
