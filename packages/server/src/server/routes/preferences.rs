use axum::{extract::Extension, Json};

use crate::domains::preferences::{Preferences, PreferencesPatch};
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;

pub async fn get_preferences_handler(
    Extension(state): Extension<AxumAppState>,
) -> Json<Preferences> {
    Json(state.preferences.current().await)
}

pub async fn update_preferences_handler(
    Extension(state): Extension<AxumAppState>,
    Json(patch): Json<PreferencesPatch>,
) -> Result<Json<Preferences>, ApiError> {
    Ok(Json(state.preferences.update(patch).await?))
}
