use super::attempt::RegistrationPhase;
use crate::common::UserId;

/// Work the orchestrator performs on the machine's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationCommand {
    CreateAuth,
    CreateProfile { user_id: UserId },
    UploadDocuments { user_id: UserId },
    Finish { user_id: UserId },
    Abort {
        phase: RegistrationPhase,
        error: String,
    },
}

impl RegistrationCommand {
    /// Commands that run a backend phase.
    pub fn is_phase(&self) -> bool {
        matches!(
            self,
            RegistrationCommand::CreateAuth
                | RegistrationCommand::CreateProfile { .. }
                | RegistrationCommand::UploadDocuments { .. }
        )
    }
}
