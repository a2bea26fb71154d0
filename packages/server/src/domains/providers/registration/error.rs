use thiserror::Error;

use super::attempt::RegistrationPhase;
use crate::domains::providers::validation::WizardStep;

#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Pre-flight validation failed; no phase was started.
    #[error("{message}")]
    Validation { step: WizardStep, message: String },

    #[error("a registration is already in progress")]
    AlreadyInProgress,

    #[error("cannot {action} while registration is {phase}")]
    InvalidState {
        action: &'static str,
        phase: RegistrationPhase,
    },

    #[error("registration failed during {phase} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        phase: RegistrationPhase,
        attempts: u32,
        last_error: String,
    },
}
