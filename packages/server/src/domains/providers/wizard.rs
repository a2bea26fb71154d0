//! The provider signup wizard: one form, eight steps, document slots.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use super::data::{RegistrationForm, RegistrationFormPatch};
use super::validation::{self, StepValidation, WizardStep};
use crate::domains::documents::{
    decode_signature_data_url, validate_document, DocumentError, DocumentFile, DocumentKind,
    PreviewHandle, PreviewRegistry,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("step {0:?} has not been reached yet")]
    StepNotReached(WizardStep),
}

/// Metadata about an attached document, without its bytes.
#[derive(Debug, Clone, Serialize)]
pub struct AttachedDocument {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WizardSnapshot {
    pub current_step: WizardStep,
    pub furthest_step: WizardStep,
    pub form: RegistrationForm,
    pub documents: HashMap<DocumentKind, AttachedDocument>,
}

pub struct RegistrationWizard {
    form: RegistrationForm,
    current_step: WizardStep,
    furthest_step: WizardStep,
    previews: HashMap<DocumentKind, PreviewHandle>,
    registry: PreviewRegistry,
}

impl RegistrationWizard {
    pub fn new(registry: PreviewRegistry) -> Self {
        Self {
            form: RegistrationForm::default(),
            current_step: WizardStep::PersonalInfo,
            furthest_step: WizardStep::PersonalInfo,
            previews: HashMap::new(),
            registry,
        }
    }

    pub fn form(&self) -> &RegistrationForm {
        &self.form
    }

    pub fn current_step(&self) -> WizardStep {
        self.current_step
    }

    pub fn update(&mut self, patch: RegistrationFormPatch) {
        self.form.apply(patch);
    }

    /// Validate the current step and move forward if it passes. On the last
    /// step a passing validation leaves the wizard where it is.
    pub fn next(&mut self, today: NaiveDate) -> StepValidation {
        let result = validation::validate_step(self.current_step, &self.form, today);
        if result.is_valid {
            if let Some(next) = self.current_step.next() {
                self.current_step = next;
                self.furthest_step = self.furthest_step.max(next);
            }
        }
        result
    }

    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.current_step.previous() {
            self.current_step = previous;
        }
        self.current_step
    }

    /// Jump to a step already reached.
    pub fn go_to(&mut self, step: WizardStep) -> Result<WizardStep, WizardError> {
        if step > self.furthest_step {
            return Err(WizardError::StepNotReached(step));
        }
        self.current_step = step;
        Ok(step)
    }

    /// Validate and store a file, replacing any earlier one. Returns the
    /// preview URL.
    pub fn attach_document(
        &mut self,
        kind: DocumentKind,
        file: DocumentFile,
    ) -> Result<String, DocumentError> {
        validate_document(kind, &file)?;

        let handle = self.registry.create(&file);
        let url = handle.url();
        debug!(kind = %kind, size = file.size(), "Document attached");

        // Dropping the previous handle revokes its preview
        self.previews.insert(kind, handle);
        self.form.set_document(kind, file);
        Ok(url)
    }

    pub fn attach_signature_data_url(&mut self, data_url: &str) -> Result<String, DocumentError> {
        let file = decode_signature_data_url(data_url)?;
        self.attach_document(DocumentKind::Signature, file)
    }

    pub fn preview_url(&self, kind: DocumentKind) -> Option<String> {
        self.previews.get(&kind).map(PreviewHandle::url)
    }

    pub fn validate_all(&self, today: NaiveDate) -> Result<(), (WizardStep, StepValidation)> {
        validation::validate_all(&self.form, today)
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        let documents = DocumentKind::ALL
            .into_iter()
            .filter_map(|kind| {
                self.form.document(kind).map(|file| {
                    (
                        kind,
                        AttachedDocument {
                            file_name: file.file_name.clone(),
                            content_type: file.content_type.clone(),
                            size: file.size(),
                            preview_url: self.preview_url(kind),
                        },
                    )
                })
            })
            .collect();

        WizardSnapshot {
            current_step: self.current_step,
            furthest_step: self.furthest_step,
            form: self.form.clone(),
            documents,
        }
    }
}
