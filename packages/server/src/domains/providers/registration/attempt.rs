use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Longest wait between two automatic attempts of a phase.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPhase {
    Idle,
    CreatingAuth,
    CreatingProfile,
    UploadingDocuments,
    Complete,
    Failed,
}

impl RegistrationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationPhase::Idle => "idle",
            RegistrationPhase::CreatingAuth => "creating_auth",
            RegistrationPhase::CreatingProfile => "creating_profile",
            RegistrationPhase::UploadingDocuments => "uploading_documents",
            RegistrationPhase::Complete => "complete",
            RegistrationPhase::Failed => "failed",
        }
    }

    /// A phase with backend work in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RegistrationPhase::CreatingAuth
                | RegistrationPhase::CreatingProfile
                | RegistrationPhase::UploadingDocuments
        )
    }
}

impl fmt::Display for RegistrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of one registration run, as shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationAttempt {
    pub phase: RegistrationPhase,
    pub retry_attempt: u32,
    pub max_retries: u32,
    /// 0..=100, only non-zero while uploading documents.
    pub upload_progress: u8,
    pub last_error: Option<String>,
    /// Phase that exhausted its retries, set while `phase` is failed.
    pub failed_phase: Option<RegistrationPhase>,
}

impl RegistrationAttempt {
    pub fn new(max_retries: u32) -> Self {
        Self {
            phase: RegistrationPhase::Idle,
            retry_attempt: 0,
            max_retries,
            upload_progress: 0,
            last_error: None,
            failed_phase: None,
        }
    }

    pub fn can_reset(&self) -> bool {
        self.phase == RegistrationPhase::Failed
    }

    /// Indicative percentage for a progress bar. Only the upload phase
    /// reports real progress.
    pub fn display_percent(&self) -> u8 {
        match self.phase {
            RegistrationPhase::Failed => match self.failed_phase {
                Some(phase) => indicative_percent(phase, 0),
                None => 0,
            },
            phase => indicative_percent(phase, self.upload_progress),
        }
    }
}

fn indicative_percent(phase: RegistrationPhase, upload_progress: u8) -> u8 {
    match phase {
        RegistrationPhase::Idle | RegistrationPhase::Failed => 0,
        RegistrationPhase::CreatingAuth => 15,
        RegistrationPhase::CreatingProfile => 45,
        RegistrationPhase::UploadingDocuments => {
            let progress = u32::from(upload_progress.min(100));
            (50 + progress * 45 / 100) as u8
        }
        RegistrationPhase::Complete => 100,
    }
}

/// How often and how patiently a failing phase is re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Retry without waiting.
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO)
    }

    /// Delay before re-running a phase after failure number `failures`
    /// (1-based): `base * 2^(failures-1)`, capped.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if self.base_delay.is_zero() || failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32 << (failures - 1).min(16);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(MAX_RETRY_DELAY)
            .min(MAX_RETRY_DELAY)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_percent_per_phase() {
        let mut attempt = RegistrationAttempt::new(3);
        assert_eq!(attempt.display_percent(), 0);

        attempt.phase = RegistrationPhase::CreatingAuth;
        assert_eq!(attempt.display_percent(), 15);

        attempt.phase = RegistrationPhase::CreatingProfile;
        assert_eq!(attempt.display_percent(), 45);

        attempt.phase = RegistrationPhase::UploadingDocuments;
        attempt.upload_progress = 0;
        assert_eq!(attempt.display_percent(), 50);
        attempt.upload_progress = 100;
        assert_eq!(attempt.display_percent(), 95);

        attempt.phase = RegistrationPhase::Complete;
        attempt.upload_progress = 0;
        assert_eq!(attempt.display_percent(), 100);
    }

    #[test]
    fn test_failed_keeps_phase_percent() {
        let mut attempt = RegistrationAttempt::new(3);
        attempt.phase = RegistrationPhase::Failed;
        attempt.failed_phase = Some(RegistrationPhase::CreatingProfile);
        assert_eq!(attempt.display_percent(), 45);
        assert!(attempt.can_reset());
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(20), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_zero_base_retries_immediately() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.delay_for(1), Duration::ZERO);
        assert_eq!(policy.delay_for(3), Duration::ZERO);
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        let json = serde_json::to_value(RegistrationPhase::UploadingDocuments).unwrap();
        assert_eq!(json, serde_json::json!("uploading_documents"));
    }
}
