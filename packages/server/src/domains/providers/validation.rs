//! Per-step validation for the provider signup wizard.
//!
//! Each step is checked by a pure function over the form; the wizard only
//! advances past a step whose validation passes.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::data::{day_name, RegistrationForm};
use crate::domains::documents::{validate_document, DocumentKind};

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid");
}

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MIN_BIOGRAPHY_CHARS: usize = 50;
pub const MAX_BIOGRAPHY_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    PersonalInfo,
    Credentials,
    Professional,
    Expertise,
    Biography,
    Availability,
    Documents,
    Signature,
}

impl WizardStep {
    pub const ALL: [WizardStep; 8] = [
        WizardStep::PersonalInfo,
        WizardStep::Credentials,
        WizardStep::Professional,
        WizardStep::Expertise,
        WizardStep::Biography,
        WizardStep::Availability,
        WizardStep::Documents,
        WizardStep::Signature,
    ];

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn next(&self) -> Option<WizardStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(&self) -> Option<WizardStep> {
        self.index().checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }
}

/// Outcome of validating one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepValidation {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl StepValidation {
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(message.into()),
        }
    }
}

type Check = Result<(), String>;

fn into_validation(check: Check) -> StepValidation {
    match check {
        Ok(()) => StepValidation::ok(),
        Err(message) => StepValidation::error(message),
    }
}

/// Validate a single step. `today` anchors the registration expiry check.
pub fn validate_step(step: WizardStep, form: &RegistrationForm, today: NaiveDate) -> StepValidation {
    into_validation(match step {
        WizardStep::PersonalInfo => check_personal_info(form),
        WizardStep::Credentials => check_credentials(form),
        WizardStep::Professional => check_professional(form, today),
        WizardStep::Expertise => check_expertise(form),
        WizardStep::Biography => check_biography(form),
        WizardStep::Availability => check_availability(form),
        WizardStep::Documents => check_documents(form),
        WizardStep::Signature => check_signature(form),
    })
}

/// Validate every step in order, returning the first failing one.
pub fn validate_all(
    form: &RegistrationForm,
    today: NaiveDate,
) -> Result<(), (WizardStep, StepValidation)> {
    for step in WizardStep::ALL {
        let validation = validate_step(step, form, today);
        if !validation.is_valid {
            return Err((step, validation));
        }
    }
    Ok(())
}

fn check_personal_info(form: &RegistrationForm) -> Check {
    if form.first_name.trim().is_empty() {
        return Err("Please enter your first name.".into());
    }
    if form.last_name.trim().is_empty() {
        return Err("Please enter your last name.".into());
    }
    if !EMAIL_RE.is_match(form.email.trim()) {
        return Err("Please enter a valid email address.".into());
    }
    let digits = form.phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = form
        .phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    if !allowed || !(7..=15).contains(&digits) {
        return Err("Please enter a valid phone number.".into());
    }
    Ok(())
}

fn check_credentials(form: &RegistrationForm) -> Check {
    if form.password.char_count() < MIN_PASSWORD_CHARS {
        return Err(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_CHARS
        ));
    }
    if form.password != form.confirm_password {
        return Err("Passwords do not match.".into());
    }
    Ok(())
}

fn check_professional(form: &RegistrationForm, today: NaiveDate) -> Check {
    if form.provider_type.is_none() {
        return Err("Please select a provider type.".into());
    }
    if form.registration_number.trim().is_empty() {
        return Err("Please enter your registration number.".into());
    }
    match form.registration_expiry {
        None => Err("Please enter your registration expiry date.".into()),
        Some(expiry) if expiry <= today => {
            Err("Registration expiry date must be in the future.".into())
        }
        Some(_) => Ok(()),
    }
}

fn check_expertise(form: &RegistrationForm) -> Check {
    if form.specializations.is_empty() {
        return Err("Please select at least one specialization.".into());
    }
    if let Some(provider_type) = form.provider_type {
        if let Some(unknown) = form
            .specializations
            .iter()
            .find(|s| !provider_type.offers(s))
        {
            return Err(format!(
                "'{}' is not a specialization offered for {}.",
                unknown, provider_type
            ));
        }
    }
    if form.services.is_empty() {
        return Err("Please select at least one service.".into());
    }
    Ok(())
}

fn check_biography(form: &RegistrationForm) -> Check {
    let chars = form.biography.trim().chars().count();
    if chars < MIN_BIOGRAPHY_CHARS {
        return Err(format!(
            "Please write a biography of at least {} characters.",
            MIN_BIOGRAPHY_CHARS
        ));
    }
    if chars > MAX_BIOGRAPHY_CHARS {
        return Err(format!(
            "Biography must be {} characters or fewer.",
            MAX_BIOGRAPHY_CHARS
        ));
    }
    Ok(())
}

fn check_availability(form: &RegistrationForm) -> Check {
    if !form.availability.any_available() {
        return Err("Please set availability for at least one day.".into());
    }
    for (day, slot) in form.availability.iter() {
        if slot.is_available && slot.end_time <= slot.start_time {
            return Err(format!(
                "End time must be after start time on {}.",
                day_name(day)
            ));
        }
    }
    Ok(())
}

fn check_documents(form: &RegistrationForm) -> Check {
    let picture = form
        .profile_picture
        .as_ref()
        .ok_or("Please upload a profile picture.")?;
    validate_document(DocumentKind::ProfilePicture, picture).map_err(|e| e.to_string())?;

    let certificate = form
        .certificate
        .as_ref()
        .ok_or("Please upload your practising certificate.")?;
    validate_document(DocumentKind::Certificate, certificate).map_err(|e| e.to_string())?;
    Ok(())
}

fn check_signature(form: &RegistrationForm) -> Check {
    let signature = form
        .signature
        .as_ref()
        .ok_or("Please provide your signature.")?;
    validate_document(DocumentKind::Signature, signature).map_err(|e| e.to_string())
}
