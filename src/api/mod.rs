use serde::{Deserialize, Serialize};

pub mod upstream;

/// Request body shared by the streaming and non-streaming relay endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// One `data:` record of the relay's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Token { token: String },
    Done { done: bool },
    Error { error: String },
}

impl StreamEvent {
    pub fn token(token: impl Into<String>) -> Self {
        StreamEvent::Token {
            token: token.into(),
        }
    }

    pub fn done() -> Self {
        StreamEvent::Done { done: true }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_events_use_flat_wire_shapes() {
        assert_eq!(
            serde_json::to_string(&StreamEvent::token("Hi")).unwrap(),
            r#"{"token":"Hi"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamEvent::done()).unwrap(),
            r#"{"done":true}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamEvent::error("boom")).unwrap(),
            r#"{"error":"boom"}"#
        );
    }

    #[test]
    fn stream_events_parse_each_record_kind() {
        let token: StreamEvent = serde_json::from_str(r#"{"token":" there"}"#).unwrap();
        assert_eq!(token, StreamEvent::token(" there"));

        let done: StreamEvent = serde_json::from_str(r#"{"done": true}"#).unwrap();
        assert_eq!(done, StreamEvent::done());

        let error: StreamEvent = serde_json::from_str(r#"{"error":"rate limited"}"#).unwrap();
        assert_eq!(error, StreamEvent::error("rate limited"));

        assert!(serde_json::from_str::<StreamEvent>(r#"{"status":"ok"}"#).is_err());
    }
}
