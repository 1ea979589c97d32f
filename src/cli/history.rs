//! Offline access to saved conversations: listing, export and deletion
//! without starting a chat session.

use std::error::Error;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::conversation::Conversation;
use crate::core::export::{write_export, ExportFormat};
use crate::core::storage::ConversationStore;
use crate::ui::renderer::render_history;

fn lookup(store: &ConversationStore, id: &str) -> Result<Conversation, Box<dyn Error>> {
    store
        .find_conversation(id)
        .ok_or_else(|| format!("No saved conversation matches '{id}'").into())
}

pub fn list_conversations(store: &ConversationStore) -> String {
    render_history(
        &store.conversations(),
        store.current_conversation_id().as_deref(),
    )
}

pub fn export_conversation(
    store: &ConversationStore,
    id: &str,
    format: ExportFormat,
    target: &Path,
) -> Result<PathBuf, Box<dyn Error>> {
    let conversation = lookup(store, id)?;
    if conversation.is_empty() {
        return Err(format!("Conversation {} has no messages", conversation.short_id()).into());
    }
    let path = write_export(&conversation, format, target)?;
    info!(conversation = %conversation.id, path = %path.display(), "Exported conversation");
    Ok(path)
}

/// Removes the matching conversation. When it was the current one the next
/// chat session starts fresh.
pub fn delete_conversation(
    store: &mut ConversationStore,
    id: &str,
) -> Result<Conversation, Box<dyn Error>> {
    let conversation = lookup(store, id)?;
    store.delete_conversation(&conversation.id)?;
    if store.current_conversation_id().as_deref() == Some(conversation.id.as_str()) {
        store.set_current_conversation_id(None)?;
    }
    Ok(conversation)
}
