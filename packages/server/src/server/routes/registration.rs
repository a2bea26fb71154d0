//! Provider signup wizard and registration endpoints.

use axum::{
    extract::{Extension, Multipart, Path},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::common::{SessionId, UserId};
use crate::domains::documents::{DocumentFile, DocumentKind};
use crate::domains::providers::{
    ProviderProfile, ProviderType, RegistrationAttempt, RegistrationFormPatch,
    RegistrationSession, RegistrationSuccess, StepValidation, WizardSnapshot,
};
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;

#[derive(Serialize)]
pub struct SpecializationsResponse {
    provider_type: ProviderType,
    specializations: &'static [&'static str],
}

pub async fn specializations_handler(
    Path(provider_type): Path<String>,
) -> Result<Json<SpecializationsResponse>, ApiError> {
    let provider_type: ProviderType = provider_type
        .parse()
        .map_err(|e: crate::domains::providers::UnknownProviderType| {
            ApiError::NotFound(e.to_string())
        })?;

    Ok(Json(SpecializationsResponse {
        provider_type,
        specializations: provider_type.specializations(),
    }))
}

#[derive(Serialize)]
pub struct SessionResponse {
    id: SessionId,
    wizard: WizardSnapshot,
    attempt: RegistrationAttempt,
    progress_percent: u8,
    busy: bool,
}

async fn session_response(session: &RegistrationSession) -> SessionResponse {
    let attempt = session.orchestrator.attempt();
    SessionResponse {
        id: session.id,
        wizard: session.wizard.lock().await.snapshot(),
        progress_percent: attempt.display_percent(),
        attempt,
        busy: session.orchestrator.is_busy(),
    }
}

async fn find_session(
    state: &AxumAppState,
    id: SessionId,
) -> Result<Arc<RegistrationSession>, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Registration session {} not found", id)))
}

pub async fn create_session_handler(
    Extension(state): Extension<AxumAppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = state.sessions.create().await;
    (StatusCode::CREATED, Json(session_response(&session).await))
}

pub async fn get_session_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    Ok(Json(session_response(&session).await))
}

pub async fn update_session_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<SessionId>,
    Json(patch): Json<RegistrationFormPatch>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    session.wizard.lock().await.update(patch);
    Ok(Json(session_response(&session).await))
}

pub async fn delete_session_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    let session = find_session(&state, id).await?;
    if session.orchestrator.is_busy() {
        return Err(ApiError::Conflict(
            "Registration is being submitted".to_string(),
        ));
    }
    state.sessions.remove(id).await;
    info!(session_id = %id, "Registration session abandoned");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct StepResponse {
    validation: StepValidation,
    #[serde(flatten)]
    session: SessionResponse,
}

pub async fn next_step_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<StepResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    let validation = session.wizard.lock().await.next(Utc::now().date_naive());
    Ok(Json(StepResponse {
        validation,
        session: session_response(&session).await,
    }))
}

pub async fn previous_step_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    session.wizard.lock().await.back();
    Ok(Json(session_response(&session).await))
}

#[derive(Serialize)]
pub struct DocumentResponse {
    kind: DocumentKind,
    preview_url: String,
}

/// Multipart upload; the file is read from the `file` field.
pub async fn upload_document_handler(
    Extension(state): Extension<AxumAppState>,
    Path((id, kind)): Path<(SessionId, String)>,
    mut multipart: Multipart,
) -> Result<Json<DocumentResponse>, ApiError> {
    let kind: DocumentKind = kind
        .parse()
        .map_err(|e: anyhow::Error| ApiError::NotFound(e.to_string()))?;
    let session = find_session(&state, id).await?;

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| kind.as_str().to_string());
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        file = Some(DocumentFile::new(file_name, content_type.as_deref(), data));
        break;
    }
    let file = file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;

    let preview_url = session.wizard.lock().await.attach_document(kind, file)?;
    Ok(Json(DocumentResponse { kind, preview_url }))
}

#[derive(Deserialize)]
pub struct SignatureRequest {
    data_url: String,
}

pub async fn signature_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<SessionId>,
    Json(request): Json<SignatureRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let session = find_session(&state, id).await?;
    let preview_url = session
        .wizard
        .lock()
        .await
        .attach_signature_data_url(&request.data_url)?;
    Ok(Json(DocumentResponse {
        kind: DocumentKind::Signature,
        preview_url,
    }))
}

#[derive(Serialize)]
pub struct RegistrationResponse {
    user_id: UserId,
    profile: ProviderProfile,
    message: &'static str,
    next: &'static str,
}

impl From<RegistrationSuccess> for RegistrationResponse {
    fn from(success: RegistrationSuccess) -> Self {
        Self {
            user_id: success.user_id,
            profile: success.profile,
            message: "Registration complete. You can now sign in.",
            next: "/login",
        }
    }
}

pub async fn submit_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<SessionId>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let session = find_session(&state, id).await?;
    let success = state.sessions.submit(&session).await?;
    Ok((StatusCode::CREATED, Json(success.into())))
}

pub async fn reset_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<SessionId>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let session = find_session(&state, id).await?;
    let success = state.sessions.reset_and_retry(&session).await?;
    Ok((StatusCode::CREATED, Json(success.into())))
}
