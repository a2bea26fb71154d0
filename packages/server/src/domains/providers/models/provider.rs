use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;

use crate::common::UserId;
use crate::domains::providers::data::{RegistrationForm, WeeklyAvailability};
use crate::domains::providers::specializations::ProviderType;

/// Review status of a provider profile. New signups start pending.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    PendingReview,
    Approved,
    Rejected,
}

#[derive(Debug, Error)]
#[error("Invalid provider status: {0}")]
pub struct InvalidProviderStatus(String);

impl std::fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderStatus::PendingReview => write!(f, "pending_review"),
            ProviderStatus::Approved => write!(f, "approved"),
            ProviderStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ProviderStatus {
    type Err = InvalidProviderStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_review" => Ok(ProviderStatus::PendingReview),
            "approved" => Ok(ProviderStatus::Approved),
            "rejected" => Ok(ProviderStatus::Rejected),
            _ => Err(InvalidProviderStatus(s.to_string())),
        }
    }
}

impl TryFrom<String> for ProviderStatus {
    type Error = InvalidProviderStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Provider profile row, keyed by the auth user id.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProviderProfile {
    pub user_id: UserId,

    // Identity
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,

    // Professional
    #[sqlx(try_from = "String")]
    pub provider_type: ProviderType,
    pub registration_number: String,
    pub registration_expiry: NaiveDate,
    pub specializations: Vec<String>,
    pub services: Vec<String>,
    pub biography: String,
    #[sqlx(json)]
    pub availability: WeeklyAvailability,

    // Documents (attached after upload)
    pub profile_picture_url: Option<String>,
    pub certificate_url: Option<String>,
    pub signature_url: Option<String>,

    #[sqlx(try_from = "String")]
    pub status: ProviderStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Every non-file field of a profile, written in the profile phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProviderProfile {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub provider_type: ProviderType,
    pub registration_number: String,
    pub registration_expiry: NaiveDate,
    pub specializations: Vec<String>,
    pub services: Vec<String>,
    pub biography: String,
    pub availability: WeeklyAvailability,
    pub status: ProviderStatus,
}

impl NewProviderProfile {
    pub fn from_form(user_id: UserId, form: &RegistrationForm) -> Result<Self> {
        Ok(Self {
            user_id,
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone.trim().to_string(),
            provider_type: form
                .provider_type
                .context("provider type missing from registration form")?,
            registration_number: form.registration_number.trim().to_string(),
            registration_expiry: form
                .registration_expiry
                .context("registration expiry missing from registration form")?,
            specializations: form.specializations.iter().cloned().collect(),
            services: form.services.iter().map(|s| s.as_str().to_string()).collect(),
            biography: form.biography.trim().to_string(),
            availability: form.availability,
            status: ProviderStatus::PendingReview,
        })
    }
}

/// Storage URLs attached in the document phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDocuments {
    pub profile_picture_url: Option<String>,
    pub certificate_url: Option<String>,
    pub signature_url: Option<String>,
}

impl ProviderProfile {
    pub async fn find_by_user_id(user_id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        let profile =
            sqlx::query_as::<_, Self>("SELECT * FROM provider_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        Ok(profile)
    }

    /// Insert or refresh the profile for `input.user_id`. Re-running it for
    /// the same user never creates a second row.
    pub async fn upsert(input: &NewProviderProfile, pool: &PgPool) -> Result<Self> {
        let profile = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO provider_profiles (
                user_id, first_name, last_name, email, phone,
                provider_type, registration_number, registration_expiry,
                specializations, services, biography, availability, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (user_id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                provider_type = EXCLUDED.provider_type,
                registration_number = EXCLUDED.registration_number,
                registration_expiry = EXCLUDED.registration_expiry,
                specializations = EXCLUDED.specializations,
                services = EXCLUDED.services,
                biography = EXCLUDED.biography,
                availability = EXCLUDED.availability,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(input.user_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.provider_type.as_str())
        .bind(&input.registration_number)
        .bind(input.registration_expiry)
        .bind(&input.specializations)
        .bind(&input.services)
        .bind(&input.biography)
        .bind(Json(&input.availability))
        .bind(input.status.to_string())
        .fetch_one(pool)
        .await?;
        Ok(profile)
    }

    pub async fn attach_documents(
        user_id: UserId,
        documents: &ProviderDocuments,
        pool: &PgPool,
    ) -> Result<Self> {
        let profile = sqlx::query_as::<_, Self>(
            r#"
            UPDATE provider_profiles SET
                profile_picture_url = COALESCE($2, profile_picture_url),
                certificate_url = COALESCE($3, certificate_url),
                signature_url = COALESCE($4, signature_url),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&documents.profile_picture_url)
        .bind(&documents.certificate_url)
        .bind(&documents.signature_url)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("no provider profile for user {}", user_id))?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::providers::data::ServiceOffering;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            ProviderStatus::PendingReview,
            ProviderStatus::Approved,
            ProviderStatus::Rejected,
        ] {
            assert_eq!(status.to_string().parse::<ProviderStatus>().unwrap(), status);
        }
        assert!("suspended".parse::<ProviderStatus>().is_err());
    }

    #[test]
    fn test_new_profile_from_form_trims_and_flattens() {
        let form = RegistrationForm {
            first_name: " Amina ".into(),
            last_name: "Diallo".into(),
            email: "amina@clinic.org".into(),
            phone: "+221771234567".into(),
            provider_type: Some(ProviderType::Doctor),
            registration_number: "MD-1".into(),
            registration_expiry: NaiveDate::from_ymd_opt(2030, 1, 1),
            specializations: ["Pediatrics".to_string()].into_iter().collect(),
            services: [ServiceOffering::HomeVisit, ServiceOffering::FollowUp]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let user_id = UserId::new();

        let profile = NewProviderProfile::from_form(user_id, &form).unwrap();

        assert_eq!(profile.first_name, "Amina");
        assert_eq!(profile.services, vec!["home_visit", "follow_up"]);
        assert_eq!(profile.status, ProviderStatus::PendingReview);
    }

    #[test]
    fn test_new_profile_requires_provider_type() {
        let form = RegistrationForm::default();
        assert!(NewProviderProfile::from_form(UserId::new(), &form).is_err());
    }

    #[test]
    fn test_profile_deserializes_rest_row() {
        let row = serde_json::json!({
            "user_id": "0b6f3f55-7c1d-4a43-9f7e-3f2b0c7d9a10",
            "first_name": "Amina",
            "last_name": "Diallo",
            "email": "amina@clinic.org",
            "phone": "+221771234567",
            "provider_type": "doctor",
            "registration_number": "MD-1",
            "registration_expiry": "2030-01-01",
            "specializations": ["Pediatrics"],
            "services": ["home_visit"],
            "biography": "bio",
            "availability": {},
            "profile_picture_url": null,
            "certificate_url": null,
            "signature_url": null,
            "status": "pending_review",
            "created_at": "2026-10-19T08:00:00.000000+00:00",
            "updated_at": "2026-10-19T08:00:00.000000+00:00"
        });

        let profile: ProviderProfile = serde_json::from_value(row).unwrap();

        assert_eq!(profile.provider_type, ProviderType::Doctor);
        assert!(!profile.availability.any_available());
    }
}
