//! Test fixtures for registration forms and wizard payloads.

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use chrono::{NaiveDate, NaiveTime, Weekday};
use serde_json::{json, Value};
use server_core::domains::documents::DocumentFile;
use server_core::domains::providers::data::{DayAvailability, Password};
use server_core::domains::providers::{ProviderType, RegistrationForm, ServiceOffering};

pub const PROVIDER_EMAIL: &str = "amina@clinic.org";
pub const PROVIDER_PASSWORD: &str = "correct-horse";

/// Tiny stand-ins; validation looks at size and content type only.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfixture";
pub const PDF_BYTES: &[u8] = b"%PDF-1.7 fixture";

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// A form that passes every wizard step.
pub fn complete_form() -> RegistrationForm {
    let mut form = RegistrationForm {
        first_name: "Amina".into(),
        last_name: "Diallo".into(),
        email: PROVIDER_EMAIL.into(),
        phone: "+221 77 123 45 67".into(),
        password: Password::new(PROVIDER_PASSWORD),
        confirm_password: Password::new(PROVIDER_PASSWORD),
        provider_type: Some(ProviderType::Doctor),
        registration_number: "MD-10293".into(),
        registration_expiry: NaiveDate::from_ymd_opt(2035, 1, 1),
        specializations: ["Cardiology".to_string()].into_iter().collect(),
        services: [ServiceOffering::VideoConsultation].into_iter().collect(),
        biography: "Cardiologist with twelve years of experience in remote patient care."
            .into(),
        ..Default::default()
    };
    *form.availability.day_mut(Weekday::Mon) = DayAvailability::available(hm(9, 0), hm(17, 0));
    form.profile_picture = Some(DocumentFile::new(
        "me.png",
        Some("image/png"),
        Bytes::from_static(PNG_BYTES),
    ));
    form.certificate = Some(DocumentFile::new(
        "licence.pdf",
        Some("application/pdf"),
        Bytes::from_static(PDF_BYTES),
    ));
    form.signature = Some(DocumentFile::new(
        "signature.png",
        Some("image/png"),
        Bytes::from_static(PNG_BYTES),
    ));
    form
}

/// The same form as `complete_form` without files, as a wizard patch.
pub fn complete_patch() -> Value {
    json!({
        "first_name": "Amina",
        "last_name": "Diallo",
        "email": PROVIDER_EMAIL,
        "phone": "+221 77 123 45 67",
        "password": PROVIDER_PASSWORD,
        "confirm_password": PROVIDER_PASSWORD,
        "provider_type": "doctor",
        "registration_number": "MD-10293",
        "registration_expiry": "2035-01-01",
        "specializations": ["Cardiology"],
        "services": ["video_consultation"],
        "biography": "Cardiologist with twelve years of experience in remote patient care.",
        "availability": {
            "monday": { "is_available": true, "start_time": "09:00", "end_time": "17:00" }
        }
    })
}

/// Canvas export of a signature.
pub fn signature_data_url() -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(PNG_BYTES))
}
