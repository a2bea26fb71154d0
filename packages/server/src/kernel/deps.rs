//! Server dependencies for domain activities (using traits for testability)
//!
//! This module provides the central dependency container used by the
//! registration orchestrator, prescreening and voice handlers. All external
//! services use trait abstractions to enable testing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use supabase::{Filter, SupabaseError, SupabaseService};

use crate::common::{AppointmentId, PatientId, UserId};
use crate::domains::prescreening::models::{Prescreening, PrescreeningStatus};
use crate::domains::providers::models::{NewProviderProfile, ProviderDocuments, ProviderProfile};
use crate::kernel::{
    stream_hub::StreamHub, AuthenticatedUser, BaseAuthService, BaseBlobStorage, BaseRecordStore,
    BaseVoiceSdk, SignUpOutcome,
};

const PROVIDER_PROFILES: &str = "provider_profiles";
const PRESCREENINGS: &str = "prescreenings";

// =============================================================================
// SupabaseService Adapter (implements auth, record and storage traits)
// =============================================================================

/// Wrapper around SupabaseService that implements the kernel traits
pub struct SupabaseAdapter {
    service: Arc<SupabaseService>,
    bucket: String,
}

impl SupabaseAdapter {
    pub fn new(service: Arc<SupabaseService>, bucket: impl Into<String>) -> Self {
        Self {
            service,
            bucket: bucket.into(),
        }
    }
}

fn to_authenticated(user: supabase::User) -> AuthenticatedUser {
    AuthenticatedUser {
        id: UserId::from_uuid(user.id),
        email: user.email,
        role: user.role,
    }
}

fn single<T>(rows: Vec<T>, what: &str) -> Result<T> {
    rows.into_iter()
        .next()
        .with_context(|| format!("Supabase returned no {} row", what))
}

#[async_trait]
impl BaseAuthService for SupabaseAdapter {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<SignUpOutcome> {
        match self.service.sign_up(email, password, metadata).await {
            Ok(result) if result.user.is_existing_account() => Ok(SignUpOutcome::AlreadyRegistered),
            Ok(result) => Ok(SignUpOutcome::Created(to_authenticated(result.user))),
            Err(e) if e.is_user_already_registered() => Ok(SignUpOutcome::AlreadyRegistered),
            Err(e) => Err(anyhow::anyhow!("{}", e)),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser> {
        let session = self
            .service
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(to_authenticated(session.user))
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthenticatedUser>> {
        match self.service.get_user(access_token).await {
            Ok(user) => Ok(Some(to_authenticated(user))),
            Err(e @ SupabaseError::Api { .. }) if matches!(e.status(), Some(401 | 403)) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("{}", e)),
        }
    }
}

#[derive(Serialize)]
struct PrescreeningRow {
    patient_id: PatientId,
    appointment_id: AppointmentId,
    status: PrescreeningStatus,
}

#[derive(Serialize)]
struct ProfileDocumentsPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_picture_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    certificate_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature_url: Option<&'a str>,
}

#[async_trait]
impl BaseRecordStore for SupabaseAdapter {
    async fn upsert_provider_profile(
        &self,
        profile: &NewProviderProfile,
    ) -> Result<ProviderProfile> {
        let rows: Vec<ProviderProfile> = self
            .service
            .upsert(PROVIDER_PROFILES, profile, "user_id")
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        single(rows, PROVIDER_PROFILES)
    }

    async fn attach_provider_documents(
        &self,
        user_id: UserId,
        documents: &ProviderDocuments,
    ) -> Result<ProviderProfile> {
        let patch = ProfileDocumentsPatch {
            profile_picture_url: documents.profile_picture_url.as_deref(),
            certificate_url: documents.certificate_url.as_deref(),
            signature_url: documents.signature_url.as_deref(),
        };
        let rows: Vec<ProviderProfile> = self
            .service
            .update(PROVIDER_PROFILES, &[Filter::eq("user_id", user_id)], &patch)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        single(rows, PROVIDER_PROFILES)
    }

    async fn find_provider_profile(&self, user_id: UserId) -> Result<Option<ProviderProfile>> {
        let rows: Vec<ProviderProfile> = self
            .service
            .select(PROVIDER_PROFILES, &[Filter::eq("user_id", user_id)])
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(rows.into_iter().next())
    }

    async fn find_prescreening(
        &self,
        patient_id: PatientId,
        appointment_id: AppointmentId,
    ) -> Result<Option<Prescreening>> {
        let rows: Vec<Prescreening> = self
            .service
            .select(
                PRESCREENINGS,
                &[
                    Filter::eq("patient_id", patient_id),
                    Filter::eq("appointment_id", appointment_id),
                ],
            )
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(rows.into_iter().next())
    }

    async fn set_prescreening_status(
        &self,
        patient_id: PatientId,
        appointment_id: AppointmentId,
        status: PrescreeningStatus,
    ) -> Result<Prescreening> {
        let row = PrescreeningRow {
            patient_id,
            appointment_id,
            status,
        };
        let rows: Vec<Prescreening> = self
            .service
            .upsert(PRESCREENINGS, &row, "patient_id,appointment_id")
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        single(rows, PRESCREENINGS)
    }
}

#[async_trait]
impl BaseBlobStorage for SupabaseAdapter {
    async fn upload(&self, path: &str, content_type: &str, data: Bytes) -> Result<String> {
        self.service
            .upload_object(&self.bucket, path, content_type, data, true)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(self.service.public_object_url(&self.bucket, path))
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Server dependencies accessible to domain code (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub auth: Arc<dyn BaseAuthService>,
    pub records: Arc<dyn BaseRecordStore>,
    pub storage: Arc<dyn BaseBlobStorage>,
    /// Voice assistant SDK (optional - not every environment has a Vapi key)
    pub voice: Option<Arc<dyn BaseVoiceSdk>>,
    /// In-process pub/sub hub for real-time streaming to SSE endpoints
    pub stream_hub: StreamHub,
}

impl ServerDeps {
    pub fn new(
        auth: Arc<dyn BaseAuthService>,
        records: Arc<dyn BaseRecordStore>,
        storage: Arc<dyn BaseBlobStorage>,
        voice: Option<Arc<dyn BaseVoiceSdk>>,
        stream_hub: StreamHub,
    ) -> Self {
        Self {
            auth,
            records,
            storage,
            voice,
            stream_hub,
        }
    }
}
