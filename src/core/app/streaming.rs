use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use super::App;
use crate::core::chat_stream::StreamMessage;

impl App {
    pub fn is_pending(&self) -> bool {
        self.session.is_pending()
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.session.is_current_stream(stream_id)
    }

    pub fn active_placeholder_id(&self) -> Option<&str> {
        self.session.active_placeholder_id()
    }

    /// Starts a request for `text`. Blank input, or a request already in
    /// flight, makes this a no-op. Returns the new stream id.
    pub fn send(&mut self, text: &str, is_regenerate: bool) -> Option<u64> {
        if text.trim().is_empty() {
            return None;
        }
        if self.is_pending() {
            debug!("Ignoring send while a reply is pending");
            return None;
        }
        Some(self.conversation().start_new_stream(text, is_regenerate))
    }

    /// Re-asks the last user message, replacing the trailing reply.
    pub fn regenerate(&mut self) -> Option<u64> {
        if !self.current.can_regenerate() {
            return None;
        }
        let text = self.current.last_user_text()?;
        self.send(&text, true)
    }

    pub fn stop(&mut self) -> bool {
        self.conversation().cancel_current_stream()
    }

    /// Applies one consumer update. Returns false for updates from streams
    /// that are no longer active.
    pub fn apply_stream_message(&mut self, message: StreamMessage, stream_id: u64) -> bool {
        let Some(placeholder_id) = self
            .session
            .active_stream
            .as_ref()
            .filter(|active| active.id == stream_id)
            .map(|active| active.placeholder_id.clone())
        else {
            debug!(stream_id, "Ignoring message from inactive stream");
            return false;
        };

        match message {
            StreamMessage::Content(content) => {
                if self.current.replace_content(&placeholder_id, content) {
                    self.conversation().persist();
                }
            }
            StreamMessage::End => {
                self.session.finish_stream(stream_id);
                self.conversation().persist();
            }
            StreamMessage::Error(error) => {
                self.session.finish_stream(stream_id);
                let placeholder_empty = self
                    .current
                    .message(&placeholder_id)
                    .is_some_and(|msg| msg.content.is_empty());
                if placeholder_empty {
                    self.current.remove_message(&placeholder_id);
                }
                warn!(stream_id, "Reply failed: {error}");
                self.last_error = Some(error);
                self.conversation().persist();
            }
        }
        true
    }

    /// Applies channel updates until no request is pending.
    pub async fn run_until_idle(&mut self, rx: &mut UnboundedReceiver<(StreamMessage, u64)>) {
        while self.is_pending() {
            match rx.recv().await {
                Some((message, stream_id)) => {
                    self.apply_stream_message(message, stream_id);
                }
                None => break,
            }
        }
    }
}
