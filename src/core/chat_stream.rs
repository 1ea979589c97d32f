use std::sync::Arc;

use futures_util::StreamExt;
use memchr::memchr;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::StreamEvent;
use crate::core::backend::{ChatBackend, TransportError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    /// Full text accumulated so far; replaces the placeholder content.
    Content(String),
    Error(String),
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed(String),
    /// The stream could not be opened; the reply came from the one-shot endpoint.
    FellBack(String),
    Cancelled(String),
}

impl StreamOutcome {
    pub fn content(&self) -> &str {
        match self {
            StreamOutcome::Completed(content)
            | StreamOutcome::FellBack(content)
            | StreamOutcome::Cancelled(content) => content,
        }
    }
}

#[derive(Debug, Error)]
pub enum StreamError {
    /// `{error}` record sent by the relay.
    #[error("{0}")]
    Remote(String),

    /// The body broke off after data had been read.
    #[error("Connection lost while streaming: {0}")]
    Transport(TransportError),

    /// Streaming could not start and the one-shot request failed as well.
    #[error("{0}")]
    Fallback(TransportError),
}

/// Carries an incomplete trailing line between reads. Lines are split on raw
/// bytes, so a multi-byte character cut by a chunk boundary is reassembled
/// before decoding.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Appends `chunk` and returns every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = memchr(b'\n', &self.pending[start..]) {
            let end = start + offset;
            if let Some(line) = decode_line(&self.pending[start..end]) {
                lines.push(line);
            }
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Returns the unterminated remainder once the body has ended.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(line) => Some(line.to_string()),
        Err(e) => {
            warn!("Invalid UTF-8 in stream: {e}");
            None
        }
    }
}

pub fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Parses one `data:` line. Anything else, and payloads that are not a
/// known record, yield `None`.
pub fn parse_event_line(line: &str) -> Option<StreamEvent> {
    let payload = extract_data_payload(line.trim())?;
    if payload.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(payload, "Skipping unrecognized stream record: {err}");
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct StreamAccumulator {
    content: String,
}

impl StreamAccumulator {
    pub fn push(&mut self, token: &str) -> &str {
        self.content.push_str(token);
        &self.content
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

/// Returns `Ok(true)` once the stream signalled completion.
fn apply_line<F>(
    line: &str,
    accumulator: &mut StreamAccumulator,
    on_content: &mut F,
) -> Result<bool, StreamError>
where
    F: FnMut(&str),
{
    match parse_event_line(line) {
        Some(StreamEvent::Token { token }) => {
            on_content(accumulator.push(&token));
            Ok(false)
        }
        Some(StreamEvent::Done { done }) => Ok(done),
        Some(StreamEvent::Error { error }) => Err(StreamError::Remote(error)),
        None => Ok(false),
    }
}

/// Streams the reply to `message`, calling `on_content` with the full text
/// accumulated so far after every token.
///
/// If the stream cannot be established (the request fails, or the body
/// errors before anything was read) the one-shot endpoint is used instead
/// and its reply is reported as a single update. Cancelling `cancel_token`
/// stops reading at the next suspension point and returns what arrived so
/// far; it also suppresses a fallback that has not finished yet.
pub async fn consume_stream<F>(
    backend: &dyn ChatBackend,
    message: &str,
    cancel_token: &CancellationToken,
    mut on_content: F,
) -> Result<StreamOutcome, StreamError>
where
    F: FnMut(&str),
{
    if cancel_token.is_cancelled() {
        return Ok(StreamOutcome::Cancelled(String::new()));
    }

    let opened = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => return Ok(StreamOutcome::Cancelled(String::new())),
        opened = backend.open_stream(message) => opened,
    };

    let mut body = match opened {
        Ok(body) => body,
        Err(err) => {
            warn!("Streaming request failed, falling back to a single request: {err}");
            return fall_back(backend, message, cancel_token, &mut on_content).await;
        }
    };

    let mut lines = LineBuffer::default();
    let mut accumulator = StreamAccumulator::default();
    let mut read_any = false;

    loop {
        if cancel_token.is_cancelled() {
            return Ok(StreamOutcome::Cancelled(accumulator.into_content()));
        }

        let next = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                return Ok(StreamOutcome::Cancelled(accumulator.into_content()));
            }
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                read_any = true;
                for line in lines.push(&chunk) {
                    if apply_line(&line, &mut accumulator, &mut on_content)? {
                        return Ok(StreamOutcome::Completed(accumulator.into_content()));
                    }
                }
            }
            Some(Err(err)) if !read_any => {
                warn!("Stream failed before any data, falling back to a single request: {err}");
                return fall_back(backend, message, cancel_token, &mut on_content).await;
            }
            Some(Err(err)) => return Err(StreamError::Transport(err)),
            None => {
                if let Some(line) = lines.finish() {
                    apply_line(&line, &mut accumulator, &mut on_content)?;
                }
                return Ok(StreamOutcome::Completed(accumulator.into_content()));
            }
        }
    }
}

async fn fall_back<F>(
    backend: &dyn ChatBackend,
    message: &str,
    cancel_token: &CancellationToken,
    on_content: &mut F,
) -> Result<StreamOutcome, StreamError>
where
    F: FnMut(&str),
{
    let reply = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => return Ok(StreamOutcome::Cancelled(String::new())),
        reply = backend.complete(message) => reply,
    };

    if cancel_token.is_cancelled() {
        return Ok(StreamOutcome::Cancelled(String::new()));
    }

    let reply = reply.map_err(StreamError::Fallback)?;
    on_content(&reply);
    Ok(StreamOutcome::FellBack(reply))
}

pub struct StreamParams {
    pub backend: Arc<dyn ChatBackend>,
    pub message: String,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

/// Runs each request on its own task and reports `(message, stream_id)`
/// pairs over one channel. A cancelled stream reports nothing further.
#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                backend,
                message,
                cancel_token,
                stream_id,
            } = params;

            let content_tx = tx.clone();
            let result = consume_stream(backend.as_ref(), &message, &cancel_token, |content| {
                let _ = content_tx.send((StreamMessage::Content(content.to_string()), stream_id));
            })
            .await;

            if cancel_token.is_cancelled() {
                debug!(stream_id, "Stream cancelled");
                return;
            }

            match result {
                Ok(StreamOutcome::Cancelled(_)) => {}
                Ok(outcome) => {
                    debug!(
                        stream_id,
                        fell_back = matches!(outcome, StreamOutcome::FellBack(_)),
                        chars = outcome.content().chars().count(),
                        "Stream finished"
                    );
                    let _ = tx.send((StreamMessage::End, stream_id));
                }
                Err(err) => {
                    warn!(stream_id, "Stream failed: {err}");
                    let _ = tx.send((StreamMessage::Error(err.to_string()), stream_id));
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}
