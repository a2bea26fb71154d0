//! Record store backed directly by Postgres, used when DATABASE_URL is set.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use super::BaseRecordStore;
use crate::common::{AppointmentId, PatientId, UserId};
use crate::domains::prescreening::models::{Prescreening, PrescreeningStatus};
use crate::domains::providers::models::{NewProviderProfile, ProviderDocuments, ProviderProfile};

pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BaseRecordStore for PostgresRecordStore {
    async fn upsert_provider_profile(
        &self,
        profile: &NewProviderProfile,
    ) -> Result<ProviderProfile> {
        ProviderProfile::upsert(profile, &self.pool).await
    }

    async fn attach_provider_documents(
        &self,
        user_id: UserId,
        documents: &ProviderDocuments,
    ) -> Result<ProviderProfile> {
        ProviderProfile::attach_documents(user_id, documents, &self.pool).await
    }

    async fn find_provider_profile(&self, user_id: UserId) -> Result<Option<ProviderProfile>> {
        ProviderProfile::find_by_user_id(user_id, &self.pool).await
    }

    async fn find_prescreening(
        &self,
        patient_id: PatientId,
        appointment_id: AppointmentId,
    ) -> Result<Option<Prescreening>> {
        Prescreening::find(patient_id, appointment_id, &self.pool).await
    }

    async fn set_prescreening_status(
        &self,
        patient_id: PatientId,
        appointment_id: AppointmentId,
        status: PrescreeningStatus,
    ) -> Result<Prescreening> {
        Prescreening::set_status(patient_id, appointment_id, status, &self.pool).await
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
