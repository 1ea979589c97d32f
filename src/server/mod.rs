//! HTTP relay between the chat client and the completion provider.
//!
//! Serves the two endpoints the client consumes: a one-shot `/api/chat` and
//! the `/api/chat/stream` event stream.

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream};
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::{ChatReply, ChatRequest, HealthStatus, StreamEvent};
use crate::core::config::RelaySettings;

pub mod error;
pub mod upstream;

pub use error::RelayError;
pub use upstream::{CompletionProvider, OpenAiProvider, TokenStream};

/// Sent when the model answers with no text.
pub const DEFAULT_REPLY: &str =
    "I'm here to help. Could you tell me more about what's on your mind?";

#[derive(Clone)]
pub struct RelayState {
    provider: Option<Arc<dyn CompletionProvider>>,
}

impl RelayState {
    /// `None` means no credential is configured; every chat request then
    /// fails with [`RelayError::MissingCredential`].
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>) -> Self {
        Self { provider }
    }

    fn provider(&self) -> Result<Arc<dyn CompletionProvider>, RelayError> {
        self.provider.clone().ok_or(RelayError::MissingCredential)
    }
}

pub fn router(state: RelayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/api/chat", post(chat))
        .route("/api/chat/stream", post(chat_stream))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}

/// Blank messages are rejected; accepted ones are forwarded as sent.
fn require_message(request: &ChatRequest) -> Result<(), RelayError> {
    if request.message.trim().is_empty() {
        return Err(RelayError::EmptyMessage);
    }
    Ok(())
}

async fn chat(
    State(state): State<RelayState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, RelayError> {
    let provider = state.provider()?;
    require_message(&request)?;

    let reply = provider.complete(&request.message).await.map_err(|err| {
        warn!("Upstream completion failed: {err}");
        RelayError::Upstream(err)
    })?;

    Ok(Json(ChatReply {
        reply: reply
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REPLY.to_string()),
    }))
}

async fn chat_stream(
    State(state): State<RelayState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, RelayError> {
    let provider = state.provider()?;
    require_message(&request)?;

    let events = relay_events(provider, request.message).map(|event| Event::default().json_data(event));
    Ok(Sse::new(events))
}

enum RelayPhase {
    Opening(Arc<dyn CompletionProvider>, String),
    Streaming(TokenStream),
    Finished,
}

/// Token records for the reply to `message`, then `done`. Any upstream
/// failure, including one while opening, becomes a final `error` record.
pub fn relay_events(
    provider: Arc<dyn CompletionProvider>,
    message: String,
) -> impl Stream<Item = StreamEvent> + Send {
    stream::unfold(
        RelayPhase::Opening(provider, message),
        |phase| async move {
            match phase {
                RelayPhase::Opening(provider, message) => match provider.stream(&message).await {
                    Ok(tokens) => next_event(tokens).await,
                    Err(err) => {
                        warn!("Upstream stream failed to open: {err}");
                        Some((StreamEvent::error(err.to_string()), RelayPhase::Finished))
                    }
                },
                RelayPhase::Streaming(tokens) => next_event(tokens).await,
                RelayPhase::Finished => None,
            }
        },
    )
}

async fn next_event(mut tokens: TokenStream) -> Option<(StreamEvent, RelayPhase)> {
    match tokens.next().await {
        Some(Ok(token)) => Some((StreamEvent::token(token), RelayPhase::Streaming(tokens))),
        Some(Err(err)) => {
            warn!("Upstream stream failed: {err}");
            Some((StreamEvent::error(err.to_string()), RelayPhase::Finished))
        }
        None => Some((StreamEvent::done(), RelayPhase::Finished)),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down relay");
}

pub async fn serve(settings: RelaySettings) -> Result<(), Box<dyn std::error::Error>> {
    let provider: Option<Arc<dyn CompletionProvider>> = match settings.api_key.clone() {
        Some(api_key) => Some(Arc::new(OpenAiProvider::new(
            reqwest::Client::new(),
            &settings,
            api_key,
        ))),
        None => {
            warn!("OPENAI_API_KEY is not set; chat requests will fail until it is configured");
            None
        }
    };

    let listener = TcpListener::bind(&settings.bind).await?;
    info!(
        model = %settings.model,
        upstream = %settings.base_url,
        "Mental coach relay listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, router(RelayState::new(provider)).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
