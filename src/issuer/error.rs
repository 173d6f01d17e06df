use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum IssuerError {
    /// The provider secret is absent from the environment
    #[error("provider secret {0} is not set")]
    MissingSecret(String),

    /// Provider answered with a non-success status
    #[error("provider returned {status}: {details}")]
    Upstream { status: u16, details: String },

    /// Provider could not be reached
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl IntoResponse for IssuerError {
    fn into_response(self) -> Response {
        error!("Session creation failed: {}", self);

        let body = match self {
            IssuerError::MissingSecret(_) => ErrorResponse::new("OpenAI API key not configured"),
            IssuerError::Upstream { details, .. } => {
                ErrorResponse::with_details("Failed to generate token", details)
            }
            IssuerError::Request(e) => {
                ErrorResponse::with_details("Failed to create session", e.to_string())
            }
            IssuerError::MalformedResponse(details) => {
                ErrorResponse::with_details("Failed to create session", details)
            }
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
