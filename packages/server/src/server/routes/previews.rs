use axum::{
    extract::{Extension, Path},
    http::header,
    response::IntoResponse,
};

use crate::common::PreviewId;
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;

/// Serve a document preview while its wizard still holds it.
pub async fn preview_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<PreviewId>,
) -> Result<impl IntoResponse, ApiError> {
    let preview = state
        .previews
        .get(id)
        .ok_or_else(|| ApiError::NotFound("Preview not found".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, preview.content_type),
            (header::CACHE_CONTROL, "private, no-store".to_string()),
        ],
        preview.data,
    ))
}
