use crate::common::UserId;

/// Inputs to the registration machine: user requests and phase outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationEvent {
    /// User submitted a validated form.
    Submitted,
    /// User asked to start over after a failed run.
    ResetRequested,
    AuthCreated { user_id: UserId },
    ProfileSaved,
    /// Bytes uploaded so far, as a percentage of all documents.
    UploadProgressed { percent: u8 },
    DocumentsUploaded,
    PhaseFailed { error: String },
    /// The run stopped before reaching a terminal phase.
    Interrupted,
}
