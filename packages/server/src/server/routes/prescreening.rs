//! Prescreening badge endpoints. All require an authenticated session, and
//! only the patient or an approved provider may read or act on a badge.

use axum::{
    extract::{Extension, Path},
    Json,
};
use tracing::warn;

use crate::common::{AppointmentId, PatientId};
use crate::domains::prescreening::{BadgeController, PrescreeningAction, PrescreeningBadge};
use crate::domains::providers::ProviderStatus;
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;
use crate::server::middleware::AuthUser;

fn controller(
    state: &AxumAppState,
    patient_id: PatientId,
    appointment_id: AppointmentId,
) -> BadgeController {
    BadgeController::new(
        state.deps.records.clone(),
        state.prescreening_actions.clone(),
        patient_id,
        appointment_id,
    )
}

/// Patients see their own prescreenings; approved providers see any.
async fn authorize(
    state: &AxumAppState,
    user: &AuthUser,
    patient_id: PatientId,
) -> Result<(), ApiError> {
    if user.user_id.as_uuid() == patient_id.as_uuid() {
        return Ok(());
    }

    let profile = state.deps.records.find_provider_profile(user.user_id).await?;
    if profile.is_some_and(|p| p.status == ProviderStatus::Approved) {
        return Ok(());
    }

    warn!(user_id = %user.user_id, %patient_id, "Prescreening access denied");
    Err(ApiError::Forbidden(
        "Not allowed to access this prescreening".to_string(),
    ))
}

pub async fn badge_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path((patient_id, appointment_id)): Path<(PatientId, AppointmentId)>,
) -> Result<Json<PrescreeningBadge>, ApiError> {
    authorize(&state, &user, patient_id).await?;
    let badge = controller(&state, patient_id, appointment_id).load().await?;
    Ok(Json(badge))
}

pub async fn start_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path((patient_id, appointment_id)): Path<(PatientId, AppointmentId)>,
) -> Result<Json<PrescreeningBadge>, ApiError> {
    authorize(&state, &user, patient_id).await?;
    let badge = controller(&state, patient_id, appointment_id)
        .trigger(PrescreeningAction::Start)
        .await?;
    Ok(Json(badge))
}

pub async fn retry_handler(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path((patient_id, appointment_id)): Path<(PatientId, AppointmentId)>,
) -> Result<Json<PrescreeningBadge>, ApiError> {
    authorize(&state, &user, patient_id).await?;
    let badge = controller(&state, patient_id, appointment_id)
        .trigger(PrescreeningAction::Retry)
        .await?;
    Ok(Json(badge))
}
