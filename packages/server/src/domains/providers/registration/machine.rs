use tracing::debug;

use super::attempt::{RegistrationAttempt, RegistrationPhase};
use super::commands::RegistrationCommand;
use super::events::RegistrationEvent;
use crate::common::{Machine, UserId};

pub const INTERRUPTED_ERROR: &str = "registration was interrupted";

/// Registration state machine - pure decision logic
///
/// Owns the attempt state. Phase outcomes that arrive in the wrong phase are
/// ignored.
pub struct RegistrationMachine {
    attempt: RegistrationAttempt,
    user_id: Option<UserId>,
}

impl RegistrationMachine {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempt: RegistrationAttempt::new(max_retries),
            user_id: None,
        }
    }

    pub fn attempt(&self) -> &RegistrationAttempt {
        &self.attempt
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    fn enter(&mut self, phase: RegistrationPhase) {
        self.attempt.phase = phase;
        if phase != RegistrationPhase::UploadingDocuments {
            self.attempt.upload_progress = 0;
        }
    }

    /// Command that (re)runs the current phase.
    fn phase_command(&self) -> Option<RegistrationCommand> {
        match self.attempt.phase {
            RegistrationPhase::CreatingAuth => Some(RegistrationCommand::CreateAuth),
            RegistrationPhase::CreatingProfile => self
                .user_id
                .map(|user_id| RegistrationCommand::CreateProfile { user_id }),
            RegistrationPhase::UploadingDocuments => self
                .user_id
                .map(|user_id| RegistrationCommand::UploadDocuments { user_id }),
            _ => None,
        }
    }

    fn start_run(&mut self) -> Option<RegistrationCommand> {
        self.user_id = None;
        self.attempt.last_error = None;
        self.attempt.failed_phase = None;
        self.enter(RegistrationPhase::CreatingAuth);
        Some(RegistrationCommand::CreateAuth)
    }
}

impl Machine for RegistrationMachine {
    type Event = RegistrationEvent;
    type Command = RegistrationCommand;

    fn decide(&mut self, event: &RegistrationEvent) -> Option<RegistrationCommand> {
        let phase = self.attempt.phase;
        match (phase, event) {
            // Fresh submission
            (RegistrationPhase::Idle, RegistrationEvent::Submitted) => self.start_run(),

            // Manual reset is the only way to clear the retry counter
            (RegistrationPhase::Failed, RegistrationEvent::ResetRequested) => {
                self.attempt.retry_attempt = 0;
                self.start_run()
            }

            (RegistrationPhase::CreatingAuth, RegistrationEvent::AuthCreated { user_id }) => {
                self.user_id = Some(*user_id);
                self.enter(RegistrationPhase::CreatingProfile);
                Some(RegistrationCommand::CreateProfile { user_id: *user_id })
            }

            (RegistrationPhase::CreatingProfile, RegistrationEvent::ProfileSaved) => {
                self.enter(RegistrationPhase::UploadingDocuments);
                self.phase_command()
            }

            (
                RegistrationPhase::UploadingDocuments,
                RegistrationEvent::UploadProgressed { percent },
            ) => {
                self.attempt.upload_progress = (*percent).min(100);
                None
            }

            (RegistrationPhase::UploadingDocuments, RegistrationEvent::DocumentsUploaded) => {
                self.enter(RegistrationPhase::Complete);
                self.user_id
                    .map(|user_id| RegistrationCommand::Finish { user_id })
            }

            (phase, RegistrationEvent::PhaseFailed { error }) if phase.is_active() => {
                self.attempt.retry_attempt += 1;
                self.attempt.last_error = Some(error.clone());

                if self.attempt.retry_attempt < self.attempt.max_retries {
                    // Same phase again
                    self.attempt.upload_progress = 0;
                    self.phase_command()
                } else {
                    self.attempt.failed_phase = Some(phase);
                    self.enter(RegistrationPhase::Failed);
                    Some(RegistrationCommand::Abort {
                        phase,
                        error: error.clone(),
                    })
                }
            }

            (phase, RegistrationEvent::Interrupted) if phase.is_active() => {
                self.attempt.last_error = Some(INTERRUPTED_ERROR.to_string());
                self.attempt.failed_phase = Some(phase);
                self.enter(RegistrationPhase::Failed);
                None
            }

            (phase, event) => {
                debug!(%phase, ?event, "Ignoring registration event");
                None
            }
        }
    }
}
