// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "register a provider") lives in domain functions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseAuthService, BaseRecordStore)

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::common::{AppointmentId, PatientId, UserId};
use crate::domains::prescreening::models::{Prescreening, PrescreeningStatus};
use crate::domains::providers::models::{NewProviderProfile, ProviderDocuments, ProviderProfile};

// =============================================================================
// Auth Service Trait (Infrastructure - credentials and sessions)
// =============================================================================

/// A user known to the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    Created(AuthenticatedUser),
    /// The email already has a credential.
    AlreadyRegistered,
}

#[async_trait]
pub trait BaseAuthService: Send + Sync {
    /// Create an email/password credential with profile metadata.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<SignUpOutcome>;

    /// Exchange email/password for the user they belong to.
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<AuthenticatedUser>;

    /// Resolve the current session behind an access token. `None` if the
    /// token is invalid or expired.
    async fn get_user(&self, access_token: &str) -> Result<Option<AuthenticatedUser>>;
}

// =============================================================================
// Record Store Trait (Infrastructure - structured rows)
// =============================================================================

#[async_trait]
pub trait BaseRecordStore: Send + Sync {
    /// Insert or update the profile keyed by its user id.
    async fn upsert_provider_profile(&self, profile: &NewProviderProfile)
        -> Result<ProviderProfile>;

    async fn attach_provider_documents(
        &self,
        user_id: UserId,
        documents: &ProviderDocuments,
    ) -> Result<ProviderProfile>;

    async fn find_provider_profile(&self, user_id: UserId) -> Result<Option<ProviderProfile>>;

    async fn find_prescreening(
        &self,
        patient_id: PatientId,
        appointment_id: AppointmentId,
    ) -> Result<Option<Prescreening>>;

    async fn set_prescreening_status(
        &self,
        patient_id: PatientId,
        appointment_id: AppointmentId,
        status: PrescreeningStatus,
    ) -> Result<Prescreening>;

    /// Cheap round trip used by the health check.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Blob Storage Trait (Infrastructure - file uploads)
// =============================================================================

#[async_trait]
pub trait BaseBlobStorage: Send + Sync {
    /// Store `data` at `path`, replacing any existing object, and return a
    /// durable URL for it.
    async fn upload(&self, path: &str, content_type: &str, data: Bytes) -> Result<String>;
}

// =============================================================================
// Voice SDK Trait (Infrastructure - real-time voice assistant calls)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceCall {
    pub id: String,
    pub assistant_id: String,
}

#[async_trait]
pub trait BaseVoiceSdk: Send + Sync {
    /// Start a call with the given assistant.
    async fn start_session(&self, assistant_id: &str) -> Result<VoiceCall>;

    /// Stop a running call.
    async fn stop_session(&self, call_id: &str) -> Result<()>;
}
