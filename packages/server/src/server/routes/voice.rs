//! Voice assistant session endpoints and the Vapi webhook.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domains::voice::{ServerMessageEnvelope, VoiceSessionState};
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartCallRequest {
    assistant_id: Option<String>,
}

pub async fn start_call_handler(
    Extension(state): Extension<AxumAppState>,
    request: Option<Json<StartCallRequest>>,
) -> Result<(StatusCode, Json<VoiceSessionState>), ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let session = state.voice.start(request.assistant_id.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn call_state_handler(
    Extension(state): Extension<AxumAppState>,
    Path(call_id): Path<String>,
) -> Result<Json<VoiceSessionState>, ApiError> {
    state
        .voice
        .state(&call_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("unknown voice call: {}", call_id)))
}

pub async fn stop_call_handler(
    Extension(state): Extension<AxumAppState>,
    Path(call_id): Path<String>,
) -> Result<Json<VoiceSessionState>, ApiError> {
    Ok(Json(state.voice.stop(&call_id).await?))
}

#[derive(Serialize)]
pub struct WebhookResponse {
    handled: bool,
}

/// Vapi server messages. Messages for calls this server did not start are
/// acknowledged and ignored.
pub async fn webhook_handler(
    Extension(state): Extension<AxumAppState>,
    Json(envelope): Json<ServerMessageEnvelope>,
) -> Json<WebhookResponse> {
    let handled = match state.voice.handle_server_message(envelope.message).await {
        Ok(handled) => handled,
        Err(e) => {
            debug!(error = %e, "Ignoring voice webhook message");
            false
        }
    };
    Json(WebhookResponse { handled })
}
