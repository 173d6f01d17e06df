use super::error::{ErrorResponse, IssuerError};
use super::state::AppState;
use crate::realtime::{SessionCredential, SessionRequest};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::info;

/// POST /api/session
/// Mint an ephemeral credential for one realtime session
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<SessionCredential>, IssuerError> {
    let api_key = state
        .api_key()
        .ok_or_else(|| IssuerError::MissingSecret(state.settings.api_key_env.clone()))?;

    let request = SessionRequest::realtime(
        &state.settings.model,
        &state.settings.voice,
        &state.instructions,
    );

    let secret = state
        .provider
        .mint_client_secret(&api_key, &request)
        .await?;

    info!("Issued session credential for model {}", state.settings.model);

    Ok(Json(SessionCredential {
        ephemeral_key: secret.value,
        model: state.settings.model.clone(),
    }))
}

/// OPTIONS /api/session
/// CORS pre-flight; headers come from the router layers
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Any other method on /api/session
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse::new("Method not allowed")),
    )
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
