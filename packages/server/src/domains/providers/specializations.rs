//! Provider types and the specializations each one may declare.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Doctor,
    Nurse,
    Pharmacist,
    Psychologist,
    Physiotherapist,
    Dentist,
    Nutritionist,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown provider type: {0}")]
pub struct UnknownProviderType(pub String);

const DOCTOR: &[&str] = &[
    "General Practice",
    "Internal Medicine",
    "Pediatrics",
    "Cardiology",
    "Dermatology",
    "Gynecology",
    "Psychiatry",
    "Endocrinology",
];

const NURSE: &[&str] = &[
    "General Nursing",
    "Midwifery",
    "Pediatric Nursing",
    "Mental Health Nursing",
    "Community Health",
    "Wound Care",
];

const PHARMACIST: &[&str] = &[
    "Community Pharmacy",
    "Clinical Pharmacy",
    "Medication Review",
    "Chronic Disease Management",
];

const PSYCHOLOGIST: &[&str] = &[
    "Clinical Psychology",
    "Counselling",
    "Child Psychology",
    "Cognitive Behavioural Therapy",
    "Trauma",
];

const PHYSIOTHERAPIST: &[&str] = &[
    "Musculoskeletal",
    "Sports Rehabilitation",
    "Neurological Rehabilitation",
    "Cardiopulmonary",
];

const DENTIST: &[&str] = &[
    "General Dentistry",
    "Orthodontics",
    "Pediatric Dentistry",
    "Oral Surgery",
];

const NUTRITIONIST: &[&str] = &[
    "Clinical Nutrition",
    "Weight Management",
    "Sports Nutrition",
    "Diabetes Nutrition",
];

impl ProviderType {
    pub const ALL: [ProviderType; 7] = [
        ProviderType::Doctor,
        ProviderType::Nurse,
        ProviderType::Pharmacist,
        ProviderType::Psychologist,
        ProviderType::Physiotherapist,
        ProviderType::Dentist,
        ProviderType::Nutritionist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Doctor => "doctor",
            ProviderType::Nurse => "nurse",
            ProviderType::Pharmacist => "pharmacist",
            ProviderType::Psychologist => "psychologist",
            ProviderType::Physiotherapist => "physiotherapist",
            ProviderType::Dentist => "dentist",
            ProviderType::Nutritionist => "nutritionist",
        }
    }

    pub fn specializations(&self) -> &'static [&'static str] {
        match self {
            ProviderType::Doctor => DOCTOR,
            ProviderType::Nurse => NURSE,
            ProviderType::Pharmacist => PHARMACIST,
            ProviderType::Psychologist => PSYCHOLOGIST,
            ProviderType::Physiotherapist => PHYSIOTHERAPIST,
            ProviderType::Dentist => DENTIST,
            ProviderType::Nutritionist => NUTRITIONIST,
        }
    }

    pub fn offers(&self, specialization: &str) -> bool {
        self.specializations().contains(&specialization)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderType {
    type Err = UnknownProviderType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownProviderType(s.to_string()))
    }
}

impl TryFrom<String> for ProviderType {
    type Error = UnknownProviderType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
