//! Provider registration: a pure state machine deciding phase transitions,
//! and an orchestrator executing them against the backend.

pub mod activities;
pub mod attempt;
pub mod commands;
pub mod error;
pub mod events;
pub mod machine;
pub mod orchestrator;

pub use attempt::{RegistrationAttempt, RegistrationPhase, RetryPolicy, MAX_RETRY_DELAY};
pub use commands::RegistrationCommand;
pub use error::RegistrationError;
pub use events::RegistrationEvent;
pub use machine::{RegistrationMachine, INTERRUPTED_ERROR};
pub use orchestrator::{RegistrationOrchestrator, RegistrationSuccess};
