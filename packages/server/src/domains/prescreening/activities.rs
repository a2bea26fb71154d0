use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use super::badge::{PrescreeningAction, PrescreeningBadge};
use super::models::PrescreeningStatus;
use crate::common::{AppointmentId, PatientId};
use crate::kernel::BaseRecordStore;

/// Current status for the pair. No record means prescreening never started.
pub async fn fetch_status(
    store: &dyn BaseRecordStore,
    patient_id: PatientId,
    appointment_id: AppointmentId,
) -> Result<PrescreeningStatus> {
    let record = store.find_prescreening(patient_id, appointment_id).await?;
    Ok(record
        .map(|r| r.status)
        .unwrap_or(PrescreeningStatus::NotStarted))
}

/// Starts or retries a prescreening. Supplied by whoever owns the call flow.
#[async_trait]
pub trait PrescreeningActions: Send + Sync {
    async fn start(&self, patient_id: PatientId, appointment_id: AppointmentId) -> Result<()>;

    async fn retry(&self, patient_id: PatientId, appointment_id: AppointmentId) -> Result<()>;
}

/// Marks the prescreening as loading; the call flow reports the outcome later.
pub struct StoreBackedPrescreeningActions {
    store: Arc<dyn BaseRecordStore>,
}

impl StoreBackedPrescreeningActions {
    pub fn new(store: Arc<dyn BaseRecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PrescreeningActions for StoreBackedPrescreeningActions {
    async fn start(&self, patient_id: PatientId, appointment_id: AppointmentId) -> Result<()> {
        self.store
            .set_prescreening_status(patient_id, appointment_id, PrescreeningStatus::Loading)
            .await?;
        Ok(())
    }

    async fn retry(&self, patient_id: PatientId, appointment_id: AppointmentId) -> Result<()> {
        self.start(patient_id, appointment_id).await
    }
}

#[derive(Debug, Error)]
pub enum BadgeError {
    #[error("'{action}' is not available while prescreening is {status}")]
    ActionUnavailable {
        action: PrescreeningAction,
        status: PrescreeningStatus,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Loads the badge for one appointment and forwards its action.
pub struct BadgeController {
    store: Arc<dyn BaseRecordStore>,
    actions: Arc<dyn PrescreeningActions>,
    patient_id: PatientId,
    appointment_id: AppointmentId,
}

impl BadgeController {
    pub fn new(
        store: Arc<dyn BaseRecordStore>,
        actions: Arc<dyn PrescreeningActions>,
        patient_id: PatientId,
        appointment_id: AppointmentId,
    ) -> Self {
        Self {
            store,
            actions,
            patient_id,
            appointment_id,
        }
    }

    pub async fn load(&self) -> Result<PrescreeningBadge> {
        let status = fetch_status(self.store.as_ref(), self.patient_id, self.appointment_id).await?;
        Ok(PrescreeningBadge::from_status(status))
    }

    /// Run `action` if the current badge offers it, then reload.
    pub async fn trigger(
        &self,
        action: PrescreeningAction,
    ) -> Result<PrescreeningBadge, BadgeError> {
        let current = self.load().await?;
        if !current.offers(action) {
            return Err(BadgeError::ActionUnavailable {
                action,
                status: current.status,
            });
        }

        info!(
            patient_id = %self.patient_id,
            appointment_id = %self.appointment_id,
            action = %action,
            "Triggering prescreening action"
        );

        match action {
            PrescreeningAction::Start => {
                self.actions
                    .start(self.patient_id, self.appointment_id)
                    .await?
            }
            PrescreeningAction::Retry => {
                self.actions
                    .retry(self.patient_id, self.appointment_id)
                    .await?
            }
        }

        Ok(self.load().await?)
    }

    /// Reload until the status leaves `loading` or `max_polls` loads were made.
    pub async fn poll_until_settled(
        &self,
        interval: Duration,
        max_polls: u32,
    ) -> Result<PrescreeningBadge> {
        let mut badge = self.load().await?;
        let mut polls = 1;
        while !badge.status.is_settled() && polls < max_polls {
            tokio::time::sleep(interval).await;
            badge = self.load().await?;
            polls += 1;
            debug!(polls, status = %badge.status, "Polled prescreening status");
        }
        Ok(badge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::InMemoryRecordStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingActions {
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl PrescreeningActions for RecordingActions {
        async fn start(&self, _: PatientId, _: AppointmentId) -> Result<()> {
            self.calls.lock().unwrap().push("start");
            Ok(())
        }

        async fn retry(&self, _: PatientId, _: AppointmentId) -> Result<()> {
            self.calls.lock().unwrap().push("retry");
            Ok(())
        }
    }

    fn controller(
        store: Arc<InMemoryRecordStore>,
        actions: Arc<dyn PrescreeningActions>,
    ) -> (BadgeController, PatientId, AppointmentId) {
        let patient = PatientId::new();
        let appointment = AppointmentId::new();
        (
            BadgeController::new(store, actions, patient, appointment),
            patient,
            appointment,
        )
    }

    #[tokio::test]
    async fn test_missing_record_is_not_started() {
        let store = Arc::new(InMemoryRecordStore::new());
        let status = fetch_status(store.as_ref(), PatientId::new(), AppointmentId::new())
            .await
            .unwrap();
        assert_eq!(status, PrescreeningStatus::NotStarted);
    }

    #[tokio::test]
    async fn test_retry_delegates_and_reloads() {
        let store = Arc::new(InMemoryRecordStore::new());
        let actions = Arc::new(RecordingActions::default());
        let (controller, patient, appointment) = controller(store.clone(), actions.clone());
        store
            .set_prescreening_status(patient, appointment, PrescreeningStatus::Failed)
            .await
            .unwrap();

        controller.trigger(PrescreeningAction::Retry).await.unwrap();

        assert_eq!(*actions.calls.lock().unwrap(), vec!["retry"]);
    }

    #[tokio::test]
    async fn test_unoffered_action_is_rejected() {
        let store = Arc::new(InMemoryRecordStore::new());
        let actions = Arc::new(RecordingActions::default());
        let (controller, _, _) = controller(store, actions.clone());

        let err = controller
            .trigger(PrescreeningAction::Retry)
            .await
            .unwrap_err();

        assert!(matches!(err, BadgeError::ActionUnavailable { .. }));
        assert!(actions.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_backed_start_sets_loading() {
        let store = Arc::new(InMemoryRecordStore::new());
        let actions = Arc::new(StoreBackedPrescreeningActions::new(store.clone()));
        let (controller, _, _) = controller(store, actions);

        let badge = controller.trigger(PrescreeningAction::Start).await.unwrap();

        assert_eq!(badge.status, PrescreeningStatus::Loading);
        assert_eq!(badge.action, None);
    }

    #[tokio::test]
    async fn test_poll_stops_after_max_polls_while_loading() {
        let store = Arc::new(InMemoryRecordStore::new());
        let actions = Arc::new(RecordingActions::default());
        let (controller, patient, appointment) = controller(store.clone(), actions);
        store
            .set_prescreening_status(patient, appointment, PrescreeningStatus::Loading)
            .await
            .unwrap();

        let badge = controller
            .poll_until_settled(Duration::from_millis(1), 3)
            .await
            .unwrap();

        assert_eq!(badge.status, PrescreeningStatus::Loading);
        assert_eq!(store.prescreening_reads(), 3);
    }
}
