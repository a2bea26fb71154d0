//! Providers domain - signup wizard, registration orchestrator and profiles

pub mod data;
pub mod models;
pub mod registration;
pub mod sessions;
pub mod specializations;
pub mod validation;
pub mod wizard;

// Re-export commonly used types
pub use data::{RegistrationForm, RegistrationFormPatch, ServiceOffering, WeeklyAvailability};
pub use models::{NewProviderProfile, ProviderDocuments, ProviderProfile, ProviderStatus};
pub use registration::{
    RegistrationAttempt, RegistrationError, RegistrationOrchestrator, RegistrationPhase,
    RegistrationSuccess, RetryPolicy, INTERRUPTED_ERROR,
};
pub use sessions::{RegistrationSession, RegistrationSessions, DEFAULT_SESSION_IDLE_TIMEOUT};
pub use specializations::{ProviderType, UnknownProviderType};
pub use validation::{validate_all, validate_step, StepValidation, WizardStep};
pub use wizard::{RegistrationWizard, WizardError, WizardSnapshot};
