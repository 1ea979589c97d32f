//! On-device persistence for conversation history.
//!
//! Storage is a plain string key-value store. The conversation history lives
//! under one key as a JSON array (most recently updated first, capped at
//! [`MAX_CONVERSATIONS`]); the active conversation id lives under another.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::conversation::Conversation;

pub const CONVERSATIONS_KEY: &str = "mental_coach_conversations";
pub const CURRENT_CONVERSATION_KEY: &str = "mental_coach_current_conversation";
pub const MAX_CONVERSATIONS: usize = 50;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize conversations: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

pub trait LocalStorage: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// One file per key inside a directory. Writes go through a temp file in the
/// same directory and are renamed over the target.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.key_path(key);

        let mut temp_file = NamedTempFile::new_in(&self.dir)?;
        temp_file.write_all(value.as_bytes())?;
        temp_file
            .persist(&path)
            .map_err(|source| StoreError::Persist { path, source })?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

pub struct ConversationStore {
    storage: Box<dyn LocalStorage>,
}

impl ConversationStore {
    pub fn new(storage: impl LocalStorage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
        }
    }

    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self::new(FileStorage::new(dir))
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::default())
    }

    /// Stored history, most recently updated first. Unreadable history is
    /// logged and treated as empty.
    pub fn conversations(&self) -> Vec<Conversation> {
        match self.read_conversations() {
            Ok(conversations) => conversations,
            Err(err) => {
                warn!("Error loading conversations: {err}");
                Vec::new()
            }
        }
    }

    fn read_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        match self.storage.get(CONVERSATIONS_KEY)? {
            Some(data) if !data.trim().is_empty() => Ok(serde_json::from_str(&data)?),
            _ => Ok(Vec::new()),
        }
    }

    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        self.conversations().into_iter().find(|c| c.id == id)
    }

    /// Looks a conversation up by full id, falling back to a unique id prefix.
    pub fn find_conversation(&self, id_or_prefix: &str) -> Option<Conversation> {
        let conversations = self.conversations();
        if let Some(exact) = conversations.iter().find(|c| c.id == id_or_prefix) {
            return Some(exact.clone());
        }
        if id_or_prefix.is_empty() {
            return None;
        }

        let mut matches = conversations
            .into_iter()
            .filter(|c| c.id.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    /// Upserts `conversation`, then keeps the [`MAX_CONVERSATIONS`] most
    /// recently updated entries.
    pub fn save_conversation(&mut self, conversation: &Conversation) -> Result<(), StoreError> {
        let mut conversations = self.conversations();
        match conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => *existing = conversation.clone(),
            None => conversations.push(conversation.clone()),
        }

        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        if conversations.len() > MAX_CONVERSATIONS {
            debug!(
                evicted = conversations.len() - MAX_CONVERSATIONS,
                "Trimming conversation history"
            );
            conversations.truncate(MAX_CONVERSATIONS);
        }

        let serialized = serde_json::to_string(&conversations)?;
        self.storage.set(CONVERSATIONS_KEY, &serialized)
    }

    /// Returns whether a conversation with `id` existed.
    pub fn delete_conversation(&mut self, id: &str) -> Result<bool, StoreError> {
        let mut conversations = self.conversations();
        let before = conversations.len();
        conversations.retain(|c| c.id != id);
        if conversations.len() == before {
            return Ok(false);
        }

        let serialized = serde_json::to_string(&conversations)?;
        self.storage.set(CONVERSATIONS_KEY, &serialized)?;
        Ok(true)
    }

    pub fn current_conversation_id(&self) -> Option<String> {
        match self.storage.get(CURRENT_CONVERSATION_KEY) {
            Ok(id) => id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()),
            Err(err) => {
                warn!("Error reading current conversation: {err}");
                None
            }
        }
    }

    pub fn set_current_conversation_id(&mut self, id: Option<&str>) -> Result<(), StoreError> {
        match id {
            Some(id) => self.storage.set(CURRENT_CONVERSATION_KEY, id),
            None => self.storage.remove(CURRENT_CONVERSATION_KEY),
        }
    }
}
