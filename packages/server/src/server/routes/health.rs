use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::server::app::AxumAppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    record_store: RecordStoreHealth,
    voice: String,
}

#[derive(Serialize)]
pub struct RecordStoreHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Returns 200 OK if the record store answers within 5s, 503 otherwise.
pub async fn health_handler(
    Extension(state): Extension<AxumAppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let record_store = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        state.deps.records.ping(),
    )
    .await
    {
        Ok(Ok(())) => RecordStoreHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => RecordStoreHealth {
            status: "error".to_string(),
            error: Some(format!("Ping failed: {}", e)),
        },
        Err(_) => RecordStoreHealth {
            status: "error".to_string(),
            error: Some("Ping timeout (>5s)".to_string()),
        },
    };

    let voice = if state.deps.voice.is_some() {
        "configured"
    } else {
        "disabled"
    };

    let is_healthy = record_store.status == "ok";
    let status_code = if is_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            record_store,
            voice: voice.to_string(),
        }),
    )
}
