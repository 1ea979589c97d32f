use tracing::{debug, warn};

use super::session::SessionContext;
use crate::core::conversation::Conversation;
use crate::core::message::Message;
use crate::core::storage::ConversationStore;

/// Mutations of the active transcript. Every change that leaves messages in
/// the list is written back to the store.
pub struct ConversationController<'a> {
    session: &'a mut SessionContext,
    current: &'a mut Conversation,
    store: &'a mut ConversationStore,
    last_error: &'a mut Option<String>,
}

impl<'a> ConversationController<'a> {
    pub fn new(
        session: &'a mut SessionContext,
        current: &'a mut Conversation,
        store: &'a mut ConversationStore,
        last_error: &'a mut Option<String>,
    ) -> Self {
        Self {
            session,
            current,
            store,
            last_error,
        }
    }

    /// Appends the user turn (or drops the reply being regenerated), adds an
    /// empty assistant placeholder and starts streaming into it.
    pub fn start_new_stream(&mut self, text: &str, is_regenerate: bool) -> u64 {
        *self.last_error = None;

        if is_regenerate {
            self.current.pop_trailing_assistant();
        } else {
            self.current.messages.push(Message::user(text));
        }

        let placeholder = Message::assistant_placeholder();
        let placeholder_id = placeholder.id.clone();
        self.current.messages.push(placeholder);
        self.persist();

        self.session.start_stream(text.to_string(), placeholder_id)
    }

    /// Stops the in-flight request. The placeholder keeps whatever content it
    /// had. Returns whether a request was pending.
    pub fn cancel_current_stream(&mut self) -> bool {
        if self.session.cancel_active_stream().is_none() {
            return false;
        }
        self.persist();
        true
    }

    pub fn edit_message(&mut self, id: &str, new_content: &str) -> bool {
        let content = new_content.trim();
        if content.is_empty() {
            debug!(%id, "Ignoring empty edit");
            return false;
        }
        if !self.current.replace_content(id, content) {
            return false;
        }
        self.persist();
        true
    }

    pub fn delete_message(&mut self, id: &str) -> bool {
        let removed = self.current.delete_message(id);
        if removed.is_empty() {
            return false;
        }

        let placeholder_removed = self
            .session
            .active_placeholder_id()
            .is_some_and(|placeholder| removed.iter().any(|msg| msg.id == placeholder));
        if placeholder_removed {
            self.session.cancel_active_stream();
        }

        self.persist();
        true
    }

    pub fn new_conversation(&mut self) {
        self.session.cancel_active_stream();
        *self.current = Conversation::new();
        *self.last_error = None;
        self.remember_current();
    }

    /// Drops the active conversation from history and starts a fresh one.
    pub fn clear_conversation(&mut self) {
        self.session.cancel_active_stream();
        if let Err(err) = self.store.delete_conversation(&self.current.id) {
            warn!("Failed to remove conversation {}: {err}", self.current.id);
        }
        self.new_conversation();
    }

    /// Switches to a stored conversation by id or unique id prefix.
    pub fn load_conversation(&mut self, id: &str) -> bool {
        let Some(conversation) = self.store.find_conversation(id) else {
            return false;
        };

        self.session.cancel_active_stream();
        *self.current = conversation;
        *self.last_error = None;
        self.remember_current();
        true
    }

    pub fn remember_current(&mut self) {
        if let Err(err) = self
            .store
            .set_current_conversation_id(Some(&self.current.id))
        {
            warn!("Failed to save current conversation id: {err}");
        }
    }

    pub fn persist(&mut self) {
        if self.current.is_empty() {
            return;
        }
        self.current.touch();
        if let Err(err) = self.store.save_conversation(&*self.current) {
            warn!("Failed to save conversation {}: {err}", self.current.id);
        }
    }
}
