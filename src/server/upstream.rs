use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::api::upstream::{ChatMessage, ChatResponse, CompletionRequest, CompletionResponse};
use crate::core::backend::{extract_error_summary, status_error, ByteStream, TransportError};
use crate::core::chat_stream::{extract_data_payload, LineBuffer};
use crate::core::config::RelaySettings;
use crate::utils::url::construct_api_url;

pub type TokenStream = BoxStream<'static, Result<String, TransportError>>;

/// The model behind the relay.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Full reply to `message`; `None` when the model returned no text.
    async fn complete(&self, message: &str) -> Result<Option<String>, TransportError>;

    /// Non-empty text deltas for the reply to `message`.
    async fn stream(&self, message: &str) -> Result<TokenStream, TransportError>;
}

/// Talks to an OpenAI-compatible `chat/completions` endpoint.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    system_prompt: String,
}

impl OpenAiProvider {
    pub fn new(client: reqwest::Client, settings: &RelaySettings, api_key: String) -> Self {
        Self {
            client,
            base_url: settings.base_url.clone(),
            api_key,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            system_prompt: settings.system_prompt.clone(),
        }
    }

    fn request(&self, message: &str, stream: bool) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(self.system_prompt.clone()),
                ChatMessage::user(message),
            ],
            stream,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    async fn post(&self, request: &CompletionRequest) -> Result<reqwest::Response, TransportError> {
        let url = construct_api_url(&self.base_url, "chat/completions");
        debug!(%url, model = %request.model, stream = request.stream, "Calling upstream");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, message: &str) -> Result<Option<String>, TransportError> {
        let response = self.post(&self.request(message, false)).await?;
        let completion = response.json::<CompletionResponse>().await?;
        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }

    async fn stream(&self, message: &str) -> Result<TokenStream, TransportError> {
        let response = self.post(&self.request(message, true)).await?;
        let body: ByteStream = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(TransportError::from)
            })
            .boxed();
        Ok(delta_tokens(body))
    }
}

struct DeltaReader {
    body: ByteStream,
    lines: LineBuffer,
    pending: VecDeque<Result<String, TransportError>>,
    finished: bool,
}

impl DeltaReader {
    fn handle_line(&mut self, line: &str) {
        if self.finished {
            return;
        }
        let Some(payload) = extract_data_payload(line.trim()) else {
            return;
        };
        if payload.is_empty() {
            return;
        }
        if payload == "[DONE]" {
            self.finished = true;
            return;
        }

        match serde_json::from_str::<ChatResponse>(payload) {
            Ok(chunk) => {
                let content = chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                    .filter(|content| !content.is_empty());
                if let Some(content) = content {
                    self.pending.push_back(Ok(content));
                }
            }
            Err(err) => {
                let summary = serde_json::from_str::<serde_json::Value>(payload)
                    .ok()
                    .and_then(|value| extract_error_summary(&value));
                match summary {
                    Some(summary) => {
                        self.pending.push_back(Err(TransportError::Other(summary)));
                        self.finished = true;
                    }
                    None => warn!(payload, "Skipping unparseable upstream chunk: {err}"),
                }
            }
        }
    }
}

/// Turns an upstream `chat.completion.chunk` event stream into its content
/// deltas, ending at `[DONE]`, at an error payload, or when the body closes.
pub fn delta_tokens(body: ByteStream) -> TokenStream {
    let reader = DeltaReader {
        body,
        lines: LineBuffer::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(reader, |mut reader| async move {
        loop {
            if let Some(item) = reader.pending.pop_front() {
                return Some((item, reader));
            }
            if reader.finished {
                return None;
            }

            match reader.body.next().await {
                Some(Ok(chunk)) => {
                    for line in reader.lines.push(&chunk) {
                        reader.handle_line(&line);
                    }
                }
                Some(Err(err)) => {
                    reader.pending.push_back(Err(err));
                    reader.finished = true;
                }
                None => {
                    if let Some(line) = reader.lines.finish() {
                        reader.handle_line(&line);
                    }
                    reader.finished = true;
                }
            }
        }
    })
    .boxed()
}
