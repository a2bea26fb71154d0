//! HTTP error mapping for the JSON API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use crate::domains::documents::DocumentError;
use crate::domains::preferences::PreferencesError;
use crate::domains::prescreening::BadgeError;
use crate::domains::providers::registration::{RegistrationError, RegistrationPhase};
use crate::domains::providers::WizardStep;
use crate::domains::voice::VoiceError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Validation {
        message: String,
        step: Option<WizardStep>,
    },
    RegistrationFailed {
        phase: RegistrationPhase,
        retry_attempt: u32,
        details: String,
    },
    ServiceUnavailable(String),
    BadGateway(String),
    Internal(anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RegistrationFailed { .. } | ApiError::BadGateway(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::BadRequest(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::ServiceUnavailable(message) => json!({ "error": message }),
            ApiError::Unauthorized => json!({ "error": "Authentication required" }),
            ApiError::Validation { message, step } => json!({ "error": message, "step": step }),
            ApiError::RegistrationFailed {
                phase,
                retry_attempt,
                details,
            } => json!({
                "error": "Registration failed. Please try again.",
                "details": details,
                "phase": phase,
                "retry_attempt": retry_attempt,
                "can_reset": true,
            }),
            ApiError::BadGateway(details) => {
                json!({ "error": "Upstream service error", "details": details })
            }
            ApiError::Internal(_) => json!({ "error": "Internal server error" }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            error!(error = %format!("{:#}", e), "Request failed");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl From<RegistrationError> for ApiError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::Validation { step, message } => ApiError::Validation {
                message,
                step: Some(step),
            },
            RegistrationError::AlreadyInProgress => ApiError::Conflict(e.to_string()),
            RegistrationError::InvalidState { .. } => ApiError::Conflict(e.to_string()),
            RegistrationError::RetriesExhausted {
                phase,
                attempts,
                last_error,
            } => ApiError::RegistrationFailed {
                phase,
                retry_attempt: attempts,
                details: last_error,
            },
        }
    }
}

impl From<DocumentError> for ApiError {
    fn from(e: DocumentError) -> Self {
        ApiError::Validation {
            message: e.to_string(),
            step: None,
        }
    }
}

impl From<BadgeError> for ApiError {
    fn from(e: BadgeError) -> Self {
        match e {
            BadgeError::ActionUnavailable { .. } => ApiError::Conflict(e.to_string()),
            BadgeError::Backend(e) => ApiError::Internal(e),
        }
    }
}

impl From<VoiceError> for ApiError {
    fn from(e: VoiceError) -> Self {
        match e {
            VoiceError::NotConfigured => ApiError::ServiceUnavailable(e.to_string()),
            VoiceError::UnknownCall(_) => ApiError::NotFound(e.to_string()),
            VoiceError::Sdk(e) => ApiError::BadGateway(format!("{:#}", e)),
        }
    }
}

impl From<PreferencesError> for ApiError {
    fn from(e: PreferencesError) -> Self {
        ApiError::Internal(e.into())
    }
}
