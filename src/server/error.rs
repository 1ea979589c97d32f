use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::api::ErrorDetail;
use crate::core::backend::TransportError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("OPENAI_API_KEY not configured")]
    MissingCredential,

    #[error("Message is required")]
    EmptyMessage,

    #[error("Error calling OpenAI API: {0}")]
    Upstream(TransportError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingCredential | RelayError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RelayError::EmptyMessage => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorDetail {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
