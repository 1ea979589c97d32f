use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::backend::ChatBackend;
use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamParams};

/// The request currently being streamed into `placeholder_id`.
#[derive(Debug, Clone)]
pub struct ActiveStream {
    pub id: u64,
    pub placeholder_id: String,
    pub cancel_token: CancellationToken,
}

pub struct SessionContext {
    pub backend: Arc<dyn ChatBackend>,
    pub stream_service: ChatStreamService,
    pub active_stream: Option<ActiveStream>,
    pub current_stream_id: u64,
}

impl SessionContext {
    pub fn new(backend: Arc<dyn ChatBackend>) -> (Self, UnboundedReceiver<(StreamMessage, u64)>) {
        let (stream_service, rx) = ChatStreamService::new();
        let session = Self {
            backend,
            stream_service,
            active_stream: None,
            current_stream_id: 0,
        };
        (session, rx)
    }

    pub fn is_pending(&self) -> bool {
        self.active_stream.is_some()
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.active_stream
            .as_ref()
            .is_some_and(|active| active.id == stream_id)
    }

    pub fn active_placeholder_id(&self) -> Option<&str> {
        self.active_stream
            .as_ref()
            .map(|active| active.placeholder_id.as_str())
    }

    /// Spawns the request and returns its stream id.
    pub fn start_stream(&mut self, message: String, placeholder_id: String) -> u64 {
        self.cancel_active_stream();

        self.current_stream_id = self.current_stream_id.wrapping_add(1);
        let stream_id = self.current_stream_id;
        let cancel_token = CancellationToken::new();

        self.stream_service.spawn_stream(StreamParams {
            backend: Arc::clone(&self.backend),
            message,
            cancel_token: cancel_token.clone(),
            stream_id,
        });
        debug!(stream_id, %placeholder_id, "Started stream");

        self.active_stream = Some(ActiveStream {
            id: stream_id,
            placeholder_id,
            cancel_token,
        });
        stream_id
    }

    /// Cancels the in-flight request, if any, and returns it.
    pub fn cancel_active_stream(&mut self) -> Option<ActiveStream> {
        let active = self.active_stream.take()?;
        active.cancel_token.cancel();
        debug!(stream_id = active.id, "Cancelled stream");
        Some(active)
    }

    /// Clears the active request once `stream_id` has finished on its own.
    pub fn finish_stream(&mut self, stream_id: u64) -> Option<ActiveStream> {
        if !self.is_current_stream(stream_id) {
            return None;
        }
        self.active_stream.take()
    }
}
