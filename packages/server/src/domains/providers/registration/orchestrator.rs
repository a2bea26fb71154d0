//! Runs the three registration phases in order with bounded retry.
//!
//! The orchestrator is the executor half of the registration machine: it
//! feeds phase outcomes to `RegistrationMachine::decide` and performs the
//! command that comes back. Attempt snapshots are published on a watch
//! channel and, when a topic is set, on the stream hub.

use chrono::Utc;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::activities::{self, PlannedUpload};
use super::attempt::{RegistrationAttempt, RegistrationPhase, RetryPolicy};
use super::commands::RegistrationCommand;
use super::error::RegistrationError;
use super::events::RegistrationEvent;
use super::machine::RegistrationMachine;
use crate::common::{Machine, UserId};
use crate::domains::providers::data::RegistrationForm;
use crate::domains::providers::models::{ProviderDocuments, ProviderProfile};
use crate::domains::providers::validation::validate_all;
use crate::kernel::ServerDeps;

/// Result of a completed registration.
#[derive(Debug, Clone)]
pub struct RegistrationSuccess {
    pub user_id: UserId,
    pub profile: ProviderProfile,
}

/// Held for the length of a run. On drop it fails a run that stopped in an
/// active phase, then clears the busy flag.
struct RunGuard<'a>(&'a RegistrationOrchestrator);

impl<'a> RunGuard<'a> {
    fn acquire(orchestrator: &'a RegistrationOrchestrator) -> Result<Self, RegistrationError> {
        orchestrator
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RegistrationError::AlreadyInProgress)?;
        Ok(Self(orchestrator))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.interrupt();
        self.0.busy.store(false, Ordering::Release);
    }
}

pub struct RegistrationOrchestrator {
    deps: Arc<ServerDeps>,
    policy: RetryPolicy,
    machine: Mutex<RegistrationMachine>,
    state: watch::Sender<RegistrationAttempt>,
    topic: Option<String>,
    busy: AtomicBool,
}

impl RegistrationOrchestrator {
    pub fn new(deps: Arc<ServerDeps>, policy: RetryPolicy) -> Self {
        let machine = RegistrationMachine::new(policy.max_retries);
        let (state, _) = watch::channel(machine.attempt().clone());
        Self {
            deps,
            policy,
            machine: Mutex::new(machine),
            state,
            topic: None,
            busy: AtomicBool::new(false),
        }
    }

    /// Also publish attempt snapshots on this stream hub topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn attempt(&self) -> RegistrationAttempt {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistrationAttempt> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Register a provider from a completed form.
    pub async fn submit(
        &self,
        form: &RegistrationForm,
    ) -> Result<RegistrationSuccess, RegistrationError> {
        let _guard = RunGuard::acquire(self)?;
        self.require_phase("submit", RegistrationPhase::Idle)?;
        preflight(form)?;
        self.run(form, RegistrationEvent::Submitted).await
    }

    /// Start over from phase 1 after a failed run, with a fresh retry budget.
    pub async fn reset_and_retry(
        &self,
        form: &RegistrationForm,
    ) -> Result<RegistrationSuccess, RegistrationError> {
        let _guard = RunGuard::acquire(self)?;
        self.require_phase("reset", RegistrationPhase::Failed)?;
        preflight(form)?;
        self.run(form, RegistrationEvent::ResetRequested).await
    }

    fn machine(&self) -> MutexGuard<'_, RegistrationMachine> {
        self.machine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn require_phase(
        &self,
        action: &'static str,
        expected: RegistrationPhase,
    ) -> Result<(), RegistrationError> {
        let phase = self.machine().attempt().phase;
        if phase != expected {
            return Err(RegistrationError::InvalidState { action, phase });
        }
        Ok(())
    }

    /// Move a run that was cancelled mid-phase to failed so it can be reset.
    fn interrupt(&self) {
        let attempt = {
            let mut machine = self.machine();
            if !machine.attempt().phase.is_active() {
                return;
            }
            machine.decide(&RegistrationEvent::Interrupted);
            machine.attempt().clone()
        };

        warn!(
            failed_phase = ?attempt.failed_phase,
            retry_attempt = attempt.retry_attempt,
            "Registration run interrupted"
        );
        self.state.send_replace(attempt.clone());
        if let Some(topic) = &self.topic {
            if !self.deps.stream_hub.try_publish_event(topic, "attempt", &attempt) {
                warn!(topic = %topic, "Stream hub busy, interrupted attempt not published");
            }
        }
    }

    /// Feed an event to the machine and publish the resulting state.
    async fn decide(&self, event: &RegistrationEvent) -> Option<RegistrationCommand> {
        let (command, attempt) = {
            let mut machine = self.machine();
            let command = machine.decide(event);
            (command, machine.attempt().clone())
        };

        self.state.send_replace(attempt.clone());
        if let Some(topic) = &self.topic {
            self.deps
                .stream_hub
                .publish_event(topic, "attempt", &attempt)
                .await;
        }
        command
    }

    async fn run(
        &self,
        form: &RegistrationForm,
        first: RegistrationEvent,
    ) -> Result<RegistrationSuccess, RegistrationError> {
        let mut profile: Option<ProviderProfile> = None;
        let mut command = self.decide(&first).await;

        loop {
            let Some(current) = command.take() else {
                let phase = self.machine().attempt().phase;
                return Err(RegistrationError::InvalidState {
                    action: "continue",
                    phase,
                });
            };

            let event = match current {
                RegistrationCommand::CreateAuth => {
                    match activities::create_auth(form, &self.deps).await {
                        Ok(user_id) => RegistrationEvent::AuthCreated { user_id },
                        Err(e) => self.phase_failed(e),
                    }
                }
                RegistrationCommand::CreateProfile { user_id } => {
                    match activities::create_profile(user_id, form, &self.deps).await {
                        Ok(saved) => {
                            profile = Some(saved);
                            RegistrationEvent::ProfileSaved
                        }
                        Err(e) => self.phase_failed(e),
                    }
                }
                RegistrationCommand::UploadDocuments { user_id } => {
                    match self.upload_documents(user_id, form).await {
                        Ok(saved) => {
                            profile = Some(saved);
                            RegistrationEvent::DocumentsUploaded
                        }
                        Err(e) => self.phase_failed(e),
                    }
                }
                RegistrationCommand::Finish { user_id } => {
                    return self.finish(user_id, profile.take()).await;
                }
                RegistrationCommand::Abort { phase, error } => {
                    let attempts = self.machine().attempt().retry_attempt;
                    error!(%phase, attempts, error = %error, "Registration failed, retries exhausted");
                    return Err(RegistrationError::RetriesExhausted {
                        phase,
                        attempts,
                        last_error: error,
                    });
                }
            };

            let failed = matches!(event, RegistrationEvent::PhaseFailed { .. });
            command = self.decide(&event).await;

            if failed && command.as_ref().is_some_and(RegistrationCommand::is_phase) {
                let retry_attempt = self.machine().attempt().retry_attempt;
                let delay = self.policy.delay_for(retry_attempt);
                warn!(
                    retry_attempt,
                    max_retries = self.policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying registration phase"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn phase_failed(&self, error: anyhow::Error) -> RegistrationEvent {
        let attempt = self.machine().attempt().clone();
        warn!(
            phase = %attempt.phase,
            retry_attempt = attempt.retry_attempt,
            error = %format!("{:#}", error),
            "Registration phase failed"
        );
        RegistrationEvent::PhaseFailed {
            error: format!("{:#}", error),
        }
    }

    async fn upload_documents(
        &self,
        user_id: UserId,
        form: &RegistrationForm,
    ) -> anyhow::Result<ProviderProfile> {
        let uploads: Vec<PlannedUpload> = activities::plan_uploads(user_id, form)?;
        let total = activities::total_bytes(&uploads);
        let mut sent = 0;
        let mut documents = ProviderDocuments::default();

        for upload in &uploads {
            let url = activities::upload_document(upload, &self.deps).await?;
            activities::record_url(&mut documents, upload.kind, url);
            sent += upload.data.len();
            self.decide(&RegistrationEvent::UploadProgressed {
                percent: activities::progress_percent(sent, total),
            })
            .await;
        }

        activities::attach_documents(user_id, &documents, &self.deps).await
    }

    async fn finish(
        &self,
        user_id: UserId,
        profile: Option<ProviderProfile>,
    ) -> Result<RegistrationSuccess, RegistrationError> {
        let Some(profile) = profile else {
            return Err(RegistrationError::InvalidState {
                action: "finish",
                phase: RegistrationPhase::Complete,
            });
        };

        info!(%user_id, "Provider registration complete");
        if let Some(topic) = &self.topic {
            self.deps
                .stream_hub
                .publish_event(
                    topic,
                    "complete",
                    &json!({ "user_id": user_id, "next": "/login" }),
                )
                .await;
        }

        Ok(RegistrationSuccess { user_id, profile })
    }
}

/// Full form validation before any backend call.
fn preflight(form: &RegistrationForm) -> Result<(), RegistrationError> {
    validate_all(form, Utc::now().date_naive()).map_err(|(step, validation)| {
        RegistrationError::Validation {
            step,
            message: validation.error.unwrap_or_default(),
        }
    })
}
