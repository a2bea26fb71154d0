//! Provider signup data: the aggregate form collected by the wizard and the
//! partial updates each step merges into it.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::specializations::ProviderType;
use crate::domains::documents::{DocumentFile, DocumentKind};

// =============================================================================
// Credentials
// =============================================================================

/// Password text. Never printed.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

// =============================================================================
// Services
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceOffering {
    VideoConsultation,
    PhoneConsultation,
    InPersonConsultation,
    HomeVisit,
    PrescriptionRenewal,
    FollowUp,
}

impl ServiceOffering {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceOffering::VideoConsultation => "video_consultation",
            ServiceOffering::PhoneConsultation => "phone_consultation",
            ServiceOffering::InPersonConsultation => "in_person_consultation",
            ServiceOffering::HomeVisit => "home_visit",
            ServiceOffering::PrescriptionRenewal => "prescription_renewal",
            ServiceOffering::FollowUp => "follow_up",
        }
    }
}

// =============================================================================
// Availability
// =============================================================================

mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub is_available: bool,
    #[serde(with = "hh_mm")]
    pub start_time: NaiveTime,
    #[serde(with = "hh_mm")]
    pub end_time: NaiveTime,
}

impl DayAvailability {
    pub fn available(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            is_available: true,
            start_time,
            end_time,
        }
    }
}

impl Default for DayAvailability {
    fn default() -> Self {
        Self {
            is_available: false,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Availability for each of the seven week days. Every day is always
/// present; days missing from an incoming payload default to unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyAvailability {
    pub monday: DayAvailability,
    pub tuesday: DayAvailability,
    pub wednesday: DayAvailability,
    pub thursday: DayAvailability,
    pub friday: DayAvailability,
    pub saturday: DayAvailability,
    pub sunday: DayAvailability,
}

pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

impl WeeklyAvailability {
    pub fn day(&self, day: Weekday) -> &DayAvailability {
        match day {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    pub fn day_mut(&mut self, day: Weekday) -> &mut DayAvailability {
        match day {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }

    /// Days in week order, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &DayAvailability)> {
        WEEK.into_iter().map(move |day| (day, self.day(day)))
    }

    pub fn any_available(&self) -> bool {
        self.iter().any(|(_, d)| d.is_available)
    }
}

// =============================================================================
// Registration form
// =============================================================================

/// Everything the signup wizard collects. Owned by a single wizard for its
/// lifetime and discarded after a successful submission.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip)]
    pub password: Password,
    #[serde(skip)]
    pub confirm_password: Password,
    pub provider_type: Option<ProviderType>,
    pub registration_number: String,
    pub registration_expiry: Option<NaiveDate>,
    pub specializations: BTreeSet<String>,
    pub services: BTreeSet<ServiceOffering>,
    pub biography: String,
    pub availability: WeeklyAvailability,
    #[serde(skip)]
    pub profile_picture: Option<DocumentFile>,
    #[serde(skip)]
    pub certificate: Option<DocumentFile>,
    #[serde(skip)]
    pub signature: Option<DocumentFile>,
}

/// Partial update sent by one wizard step. Absent fields are left as-is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationFormPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<Password>,
    pub confirm_password: Option<Password>,
    pub provider_type: Option<ProviderType>,
    pub registration_number: Option<String>,
    pub registration_expiry: Option<NaiveDate>,
    pub specializations: Option<BTreeSet<String>>,
    pub services: Option<BTreeSet<ServiceOffering>>,
    pub biography: Option<String>,
    pub availability: Option<WeeklyAvailability>,
}

impl RegistrationForm {
    /// Merge a step's partial update into the form.
    pub fn apply(&mut self, patch: RegistrationFormPatch) {
        if let Some(v) = patch.first_name {
            self.first_name = v;
        }
        if let Some(v) = patch.last_name {
            self.last_name = v;
        }
        if let Some(v) = patch.email {
            self.email = v.trim().to_lowercase();
        }
        if let Some(v) = patch.phone {
            self.phone = v;
        }
        if let Some(v) = patch.password {
            self.password = v;
        }
        if let Some(v) = patch.confirm_password {
            self.confirm_password = v;
        }
        if let Some(v) = patch.provider_type {
            if self.provider_type != Some(v) {
                // Specializations belong to a provider type
                self.specializations.retain(|s| v.offers(s));
            }
            self.provider_type = Some(v);
        }
        if let Some(v) = patch.registration_number {
            self.registration_number = v;
        }
        if let Some(v) = patch.registration_expiry {
            self.registration_expiry = Some(v);
        }
        if let Some(v) = patch.specializations {
            self.specializations = v;
        }
        if let Some(v) = patch.services {
            self.services = v;
        }
        if let Some(v) = patch.biography {
            self.biography = v;
        }
        if let Some(v) = patch.availability {
            self.availability = v;
        }
    }

    pub fn document(&self, kind: DocumentKind) -> Option<&DocumentFile> {
        match kind {
            DocumentKind::ProfilePicture => self.profile_picture.as_ref(),
            DocumentKind::Certificate => self.certificate.as_ref(),
            DocumentKind::Signature => self.signature.as_ref(),
        }
    }

    pub fn set_document(&mut self, kind: DocumentKind, file: DocumentFile) {
        let slot = match kind {
            DocumentKind::ProfilePicture => &mut self.profile_picture,
            DocumentKind::Certificate => &mut self.certificate,
            DocumentKind::Signature => &mut self.signature,
        };
        *slot = Some(file);
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut form = RegistrationForm {
            first_name: "Amina".to_string(),
            last_name: "Diallo".to_string(),
            ..Default::default()
        };

        form.apply(RegistrationFormPatch {
            last_name: Some("Diallo-Ba".to_string()),
            ..Default::default()
        });

        assert_eq!(form.first_name, "Amina");
        assert_eq!(form.last_name, "Diallo-Ba");
    }

    #[test]
    fn test_email_is_normalized() {
        let mut form = RegistrationForm::default();
        form.apply(RegistrationFormPatch {
            email: Some("  Dr.Amina@Clinic.org ".to_string()),
            ..Default::default()
        });
        assert_eq!(form.email, "dr.amina@clinic.org");
    }

    #[test]
    fn test_changing_provider_type_drops_foreign_specializations() {
        let mut form = RegistrationForm {
            provider_type: Some(ProviderType::Doctor),
            specializations: ["Cardiology", "Pediatrics"]
                .into_iter()
                .map(String::from)
                .collect(),
            ..Default::default()
        };

        form.apply(RegistrationFormPatch {
            provider_type: Some(ProviderType::Nurse),
            ..Default::default()
        });

        assert!(form.specializations.is_empty());
    }

    #[test]
    fn test_patch_deserializes_from_partial_json() {
        let patch: RegistrationFormPatch = serde_json::from_value(serde_json::json!({
            "provider_type": "psychologist",
            "services": ["video_consultation", "follow_up"],
            "registration_expiry": "2030-01-31"
        }))
        .unwrap();

        assert_eq!(patch.provider_type, Some(ProviderType::Psychologist));
        assert_eq!(patch.services.unwrap().len(), 2);
        assert!(patch.first_name.is_none());
    }

    #[test]
    fn test_availability_missing_days_default_to_unavailable() {
        let availability: WeeklyAvailability = serde_json::from_value(serde_json::json!({
            "monday": { "is_available": true, "start_time": "08:30", "end_time": "12:00" }
        }))
        .unwrap();

        assert!(availability.monday.is_available);
        assert_eq!(
            availability.monday.start_time,
            NaiveTime::from_hms_opt(8, 30, 0).unwrap()
        );
        assert_eq!(availability.iter().filter(|(_, d)| d.is_available).count(), 1);
        assert_eq!(availability.iter().count(), 7);
    }

    #[test]
    fn test_availability_serializes_hh_mm() {
        let json = serde_json::to_value(WeeklyAvailability::default()).unwrap();
        assert_eq!(json["friday"]["start_time"], "09:00");
        assert_eq!(json["sunday"]["is_available"], false);
    }

    #[test]
    fn test_password_never_printed() {
        let form = RegistrationForm {
            password: Password::new("hunter2-secret"),
            ..Default::default()
        };
        let printed = format!("{:?}", form);
        assert!(!printed.contains("hunter2"));
        assert!(serde_json::to_string(&form).unwrap().find("hunter2").is_none());
    }

    #[test]
    fn test_set_document_fills_matching_slot() {
        let mut form = RegistrationForm::default();
        let file = DocumentFile::new("c.pdf", Some("application/pdf"), Bytes::from_static(b"%PDF"));
        form.set_document(DocumentKind::Certificate, file.clone());
        assert_eq!(form.document(DocumentKind::Certificate), Some(&file));
        assert!(form.document(DocumentKind::Signature).is_none());
    }
}
