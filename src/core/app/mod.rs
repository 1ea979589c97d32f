use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::core::backend::ChatBackend;
use crate::core::chat_stream::StreamMessage;
use crate::core::conversation::Conversation;
use crate::core::message::Message;
use crate::core::storage::ConversationStore;

pub mod conversation;
pub mod session;
mod streaming;

pub use conversation::ConversationController;
pub use session::{ActiveStream, SessionContext};

/// Owns the active conversation and drives requests for it.
pub struct App {
    pub session: SessionContext,
    current: Conversation,
    store: ConversationStore,
    last_error: Option<String>,
}

impl App {
    /// Restores the conversation recorded as current in `store`, or starts a
    /// fresh one when that id is missing from history.
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: ConversationStore,
    ) -> (Self, UnboundedReceiver<(StreamMessage, u64)>) {
        let (session, rx) = SessionContext::new(backend);
        let restored = store
            .current_conversation_id()
            .and_then(|id| store.conversation(&id));
        let is_restored = restored.is_some();

        let mut app = Self {
            session,
            current: restored.unwrap_or_default(),
            store,
            last_error: None,
        };
        if !is_restored {
            app.conversation().remember_current();
        }
        (app, rx)
    }

    pub fn conversation(&mut self) -> ConversationController<'_> {
        ConversationController::new(
            &mut self.session,
            &mut self.current,
            &mut self.store,
            &mut self.last_error,
        )
    }

    pub fn current_conversation(&self) -> &Conversation {
        &self.current
    }

    pub fn messages(&self) -> &[Message] {
        &self.current.messages
    }

    /// The error to show the user, cleared by the next send.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn history(&self) -> Vec<Conversation> {
        self.store.conversations()
    }

    pub fn edit_message(&mut self, id: &str, new_content: &str) -> bool {
        self.conversation().edit_message(id, new_content)
    }

    pub fn delete_message(&mut self, id: &str) -> bool {
        self.conversation().delete_message(id)
    }

    pub fn new_conversation(&mut self) {
        self.conversation().new_conversation();
    }

    pub fn clear_conversation(&mut self) {
        self.conversation().clear_conversation();
    }

    pub fn load_conversation(&mut self, id: &str) -> bool {
        self.conversation().load_conversation(id)
    }
}
