use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use futures_util::StreamExt;

use crate::core::app::App;
use crate::core::backend::{ByteStream, ChatBackend, TransportError};
use crate::core::chat_stream::StreamMessage;
use crate::core::conversation::Conversation;
use crate::core::message::{Message, Role};
use crate::core::storage::ConversationStore;
use tokio::sync::mpsc::UnboundedReceiver;

pub fn create_test_message(role: &str, content: &str) -> Message {
    let role = Role::try_from(role).expect("test role should be user or assistant");
    Message::new(role, content)
}

pub fn conversation_with(turns: &[(&str, &str)]) -> Conversation {
    let mut conversation = Conversation::new();
    conversation.messages = turns
        .iter()
        .map(|(role, content)| create_test_message(role, content))
        .collect();
    conversation
}

/// Frames one event payload the way the relay writes it.
pub fn sse_record(payload: &str) -> String {
    format!("data: {payload}\n\n")
}

#[derive(Clone, Debug)]
pub enum FakeChunk {
    Bytes(Vec<u8>),
    Fail(&'static str),
    /// Keeps the body open without producing data. Only meaningful last.
    Hang,
}

impl FakeChunk {
    pub fn text(text: &str) -> Self {
        FakeChunk::Bytes(text.as_bytes().to_vec())
    }
}

/// Scripted relay: the stream body is replayed from `chunks` and the one-shot
/// endpoint answers with `reply`.
pub struct FakeBackend {
    pub open_error: Option<&'static str>,
    pub chunks: Vec<FakeChunk>,
    pub reply: Result<String, &'static str>,
    pub hang_on_complete: bool,
    pub stream_calls: AtomicUsize,
    pub complete_calls: AtomicUsize,
    pub messages: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn with_chunks(chunks: Vec<FakeChunk>) -> Self {
        Self {
            open_error: None,
            chunks,
            reply: Err("no fallback reply scripted"),
            hang_on_complete: false,
            stream_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn streaming(chunks: &[&str]) -> Self {
        Self::with_chunks(chunks.iter().map(|chunk| FakeChunk::text(chunk)).collect())
    }

    pub fn tokens(tokens: &[&str]) -> Self {
        let mut chunks: Vec<FakeChunk> = tokens
            .iter()
            .map(|token| {
                let payload = serde_json::json!({ "token": token }).to_string();
                FakeChunk::text(&sse_record(&payload))
            })
            .collect();
        chunks.push(FakeChunk::text(&sse_record(r#"{"done":true}"#)));
        Self::with_chunks(chunks)
    }

    pub fn failing_to_open(detail: &'static str) -> Self {
        let mut backend = Self::with_chunks(Vec::new());
        backend.open_error = Some(detail);
        backend
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = Ok(reply.to_string());
        self
    }

    pub fn with_failing_reply(mut self, detail: &'static str) -> Self {
        self.reply = Err(detail);
        self
    }

    pub fn with_hanging_reply(mut self) -> Self {
        self.hang_on_complete = true;
        self
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.messages.lock().expect("messages lock").clone()
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn open_stream(&self, message: &str) -> Result<ByteStream, TransportError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.messages
            .lock()
            .expect("messages lock")
            .push(message.to_string());

        if let Some(detail) = self.open_error {
            return Err(TransportError::Status {
                status: 503,
                detail: detail.to_string(),
            });
        }

        let hang = matches!(self.chunks.last(), Some(FakeChunk::Hang));
        let items: Vec<Result<Vec<u8>, TransportError>> = self
            .chunks
            .iter()
            .filter_map(|chunk| match chunk {
                FakeChunk::Bytes(bytes) => Some(Ok(bytes.clone())),
                FakeChunk::Fail(reason) => Some(Err(TransportError::Other(reason.to_string()))),
                FakeChunk::Hang => None,
            })
            .collect();

        let body = stream::iter(items);
        if hang {
            Ok(body.chain(stream::pending()).boxed())
        } else {
            Ok(body.boxed())
        }
    }

    async fn complete(&self, _message: &str) -> Result<String, TransportError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_on_complete {
            std::future::pending::<()>().await;
        }
        self.reply.clone().map_err(|detail| TransportError::Status {
            status: 500,
            detail: detail.to_string(),
        })
    }
}

pub fn create_test_app(
    backend: FakeBackend,
) -> (App, UnboundedReceiver<(StreamMessage, u64)>, Arc<FakeBackend>) {
    create_test_app_with_store(backend, ConversationStore::in_memory())
}

pub fn create_test_app_with_store(
    backend: FakeBackend,
    store: ConversationStore,
) -> (App, UnboundedReceiver<(StreamMessage, u64)>, Arc<FakeBackend>) {
    let backend = Arc::new(backend);
    let (app, rx) = App::new(backend.clone(), store);
    (app, rx, backend)
}
