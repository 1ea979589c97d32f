use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use thiserror::Error;

use crate::api::{ChatReply, ChatRequest};
use crate::utils::url::construct_api_url;

pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx answer; `detail` is the server's message when it sent one.
    #[error("{detail}")]
    Status { status: u16, detail: String },

    #[error("{0}")]
    Other(String),
}

/// The two relay endpoints the client talks to.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Opens the event stream for `message`. Failing here means the stream
    /// could not be established at all.
    async fn open_stream(&self, message: &str) -> Result<ByteStream, TransportError>;

    /// One-shot request returning the complete reply.
    async fn complete(&self, message: &str) -> Result<String, TransportError>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
}

impl HttpBackend {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }

    async fn post(
        &self,
        endpoint: &str,
        message: &str,
    ) -> Result<reqwest::Response, TransportError> {
        let url = construct_api_url(&self.api_url, endpoint);
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(&ChatRequest {
                message: message.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn open_stream(&self, message: &str) -> Result<ByteStream, TransportError> {
        let response = self.post("api/chat/stream", message).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(TransportError::from)
            })
            .boxed())
    }

    async fn complete(&self, message: &str) -> Result<String, TransportError> {
        let response = self.post("api/chat", message).await?;
        let reply = response.json::<ChatReply>().await?;
        Ok(reply.reply)
    }
}

pub(crate) async fn status_error(response: reqwest::Response) -> TransportError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| extract_error_summary(&value))
        .filter(|summary| !summary.is_empty())
        .unwrap_or_else(|| format!("HTTP error! status: {status}"));
    TransportError::Status { status, detail }
}

/// Pulls a one-line message out of the error bodies relays and providers
/// send: `{detail}`, `{error: "..."}`, `{error: {message}}` or `{message}`.
pub fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .get("detail")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                serde_json::Value::Object(map) => map
                    .get("message")
                    .and_then(|message| message.as_str().map(str::to_owned)),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_summary_prefers_detail() {
        let value = json!({"detail": "OPENAI_API_KEY not configured", "error": "other"});
        assert_eq!(
            extract_error_summary(&value).as_deref(),
            Some("OPENAI_API_KEY not configured")
        );
    }

    #[test]
    fn error_summary_reads_nested_and_flat_errors() {
        let nested = json!({"error": {"message": "model   overloaded\n now"}});
        assert_eq!(
            extract_error_summary(&nested).as_deref(),
            Some("model overloaded now")
        );

        let flat = json!({"error": "Message is required"});
        assert_eq!(
            extract_error_summary(&flat).as_deref(),
            Some("Message is required")
        );

        assert_eq!(extract_error_summary(&json!({"status": "failed"})), None);
    }
}
