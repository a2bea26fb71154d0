use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;

use crate::common::{AppointmentId, PatientId};

/// Outcome of the automated prescreening call for one appointment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PrescreeningStatus {
    Successful,
    Failed,
    EmergencyDeclared,
    Loading,
    NotStarted,
}

#[derive(Debug, Error)]
#[error("Invalid prescreening status: {0}")]
pub struct InvalidPrescreeningStatus(String);

impl PrescreeningStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescreeningStatus::Successful => "successful",
            PrescreeningStatus::Failed => "failed",
            PrescreeningStatus::EmergencyDeclared => "emergency_declared",
            PrescreeningStatus::Loading => "loading",
            PrescreeningStatus::NotStarted => "not_started",
        }
    }

    /// Final states never change without a user action.
    pub fn is_settled(&self) -> bool {
        !matches!(self, PrescreeningStatus::Loading)
    }
}

impl std::fmt::Display for PrescreeningStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PrescreeningStatus {
    type Err = InvalidPrescreeningStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "successful" => Ok(PrescreeningStatus::Successful),
            "failed" => Ok(PrescreeningStatus::Failed),
            "emergency_declared" => Ok(PrescreeningStatus::EmergencyDeclared),
            "loading" => Ok(PrescreeningStatus::Loading),
            "not_started" => Ok(PrescreeningStatus::NotStarted),
            _ => Err(InvalidPrescreeningStatus(s.to_string())),
        }
    }
}

impl TryFrom<String> for PrescreeningStatus {
    type Error = InvalidPrescreeningStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Prescreening record for a (patient, appointment) pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Prescreening {
    pub patient_id: PatientId,
    pub appointment_id: AppointmentId,
    #[sqlx(try_from = "String")]
    pub status: PrescreeningStatus,
    pub updated_at: DateTime<Utc>,
}

impl Prescreening {
    pub async fn find(
        patient_id: PatientId,
        appointment_id: AppointmentId,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let row = sqlx::query_as::<_, Self>(
            "SELECT * FROM prescreenings WHERE patient_id = $1 AND appointment_id = $2",
        )
        .bind(patient_id)
        .bind(appointment_id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    pub async fn set_status(
        patient_id: PatientId,
        appointment_id: AppointmentId,
        status: PrescreeningStatus,
        pool: &PgPool,
    ) -> Result<Self> {
        let row = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO prescreenings (patient_id, appointment_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (patient_id, appointment_id) DO UPDATE SET
                status = EXCLUDED.status,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(patient_id)
        .bind(appointment_id)
        .bind(status.as_str())
        .fetch_one(pool)
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_keys() {
        assert_eq!(
            "emergency_declared".parse::<PrescreeningStatus>().unwrap(),
            PrescreeningStatus::EmergencyDeclared
        );
        assert_eq!(PrescreeningStatus::NotStarted.to_string(), "not_started");
        assert!("pending".parse::<PrescreeningStatus>().is_err());
    }

    #[test]
    fn test_only_loading_is_unsettled() {
        assert!(!PrescreeningStatus::Loading.is_settled());
        assert!(PrescreeningStatus::Failed.is_settled());
        assert!(PrescreeningStatus::NotStarted.is_settled());
    }

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_value(PrescreeningStatus::EmergencyDeclared).unwrap();
        assert_eq!(json, serde_json::json!("emergency_declared"));
    }
}
