//! Integration tests for the registration orchestrator against mocked
//! backend services.
//!
//! Covers:
//! - Phase ordering across auth, profile and storage
//! - Bounded retry and exhaustion
//! - Idempotent re-runs (one credential, one profile)
//! - Progress reporting
//! - Busy guard, cancellation and reset

mod common;

use bytes::Bytes;
use common::{complete_form, PROVIDER_EMAIL};
use server_core::domains::documents::{DocumentFile, MAX_DOCUMENT_BYTES};
use server_core::domains::providers::{
    RegistrationAttempt, RegistrationError, RegistrationOrchestrator, RegistrationPhase,
    RetryPolicy, WizardStep, INTERRUPTED_ERROR,
};
use server_core::kernel::TestDependencies;
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(deps: &TestDependencies) -> RegistrationOrchestrator {
    RegistrationOrchestrator::new(deps.into_server_deps(), RetryPolicy::immediate(3))
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_phases_run_in_order() {
    let deps = TestDependencies::new();
    let orchestrator = orchestrator(&deps);

    let success = orchestrator.submit(&complete_form()).await.unwrap();

    let log = &deps.log;
    let sign_up = log.position("sign_up").unwrap();
    let profile = log.position("upsert_profile").unwrap();
    let upload = log.position("upload").unwrap();
    let attach = log.position("attach_documents").unwrap();
    assert!(sign_up < profile, "calls: {:?}", log.calls());
    assert!(profile < upload, "calls: {:?}", log.calls());
    assert!(upload < attach, "calls: {:?}", log.calls());

    assert_eq!(orchestrator.attempt().phase, RegistrationPhase::Complete);
    assert_eq!(orchestrator.attempt().display_percent(), 100);
    assert_eq!(success.profile.email, PROVIDER_EMAIL);
}

#[tokio::test]
async fn test_documents_stored_under_user_folder() {
    let deps = TestDependencies::new();
    let orchestrator = orchestrator(&deps);

    let success = orchestrator.submit(&complete_form()).await.unwrap();

    let prefix = format!("providers/{}/", success.user_id);
    assert_eq!(
        deps.storage.paths(),
        vec![
            format!("{}certificate.pdf", prefix),
            format!("{}profile_picture.png", prefix),
            format!("{}signature.png", prefix),
        ]
    );
    assert_eq!(
        deps.storage
            .content_type(&format!("{}certificate.pdf", prefix))
            .as_deref(),
        Some("application/pdf")
    );

    let profile = deps.records.profile(success.user_id).unwrap();
    assert_eq!(
        profile.certificate_url,
        Some(format!("https://storage.test/{}certificate.pdf", prefix))
    );
    assert!(profile.profile_picture_url.is_some());
    assert!(profile.signature_url.is_some());
}

#[tokio::test]
async fn test_missing_signature_stops_before_backend_calls() {
    let deps = TestDependencies::new();
    let orchestrator = orchestrator(&deps);
    let mut unsigned = complete_form();
    unsigned.signature = None;
    let err = orchestrator.submit(&unsigned).await.unwrap_err();

    assert!(matches!(
        err,
        RegistrationError::Validation {
            step: WizardStep::Signature,
            ..
        }
    ));
    assert!(deps.log.calls().is_empty());
}

// ============================================================================
// Retry behavior
// ============================================================================

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let deps = TestDependencies::new().mock_auth(|auth| auth.fail_sign_up(2));
    let orchestrator = orchestrator(&deps);

    orchestrator.submit(&complete_form()).await.unwrap();

    assert_eq!(deps.log.count("sign_up"), 3);
    assert_eq!(deps.auth.credential_count(), 1);
    assert_eq!(orchestrator.attempt().retry_attempt, 2);
}

#[tokio::test]
async fn test_third_failure_exhausts_retries() {
    let deps = TestDependencies::new().mock_records(|records| records.fail_upsert(3));
    let orchestrator = orchestrator(&deps);

    let err = orchestrator.submit(&complete_form()).await.unwrap_err();

    match err {
        RegistrationError::RetriesExhausted {
            phase, attempts, ..
        } => {
            assert_eq!(phase, RegistrationPhase::CreatingProfile);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }

    let attempt = orchestrator.attempt();
    assert_eq!(attempt.phase, RegistrationPhase::Failed);
    assert_eq!(attempt.failed_phase, Some(RegistrationPhase::CreatingProfile));
    assert!(attempt.can_reset());
    assert_eq!(attempt.display_percent(), 45);
    assert_eq!(deps.log.count("upload"), 0);
}

#[tokio::test]
async fn test_retry_budget_spans_phases() {
    let deps = TestDependencies::new()
        .mock_auth(|auth| auth.fail_sign_up(1))
        .mock_storage(|storage| storage.fail_upload(2));
    let orchestrator = orchestrator(&deps);

    let err = orchestrator.submit(&complete_form()).await.unwrap_err();

    assert!(matches!(
        err,
        RegistrationError::RetriesExhausted {
            phase: RegistrationPhase::UploadingDocuments,
            attempts: 3,
            ..
        }
    ));
}

#[tokio::test]
async fn test_lost_sign_up_response_creates_one_credential() {
    let deps = TestDependencies::new().mock_auth(|auth| auth.commit_then_fail(1));
    let orchestrator = orchestrator(&deps);

    let success = orchestrator.submit(&complete_form()).await.unwrap();

    assert_eq!(deps.auth.credential_count(), 1);
    assert_eq!(deps.records.profile_count(), 1);
    assert_eq!(deps.log.count("sign_in"), 1);
    assert_eq!(
        deps.auth.user_for(PROVIDER_EMAIL).map(|u| u.id),
        Some(success.user_id)
    );
}

#[tokio::test]
async fn test_upload_retry_keeps_single_profile() {
    let deps = TestDependencies::new().mock_records(|records| records.fail_attach(1));
    let orchestrator = orchestrator(&deps);

    orchestrator.submit(&complete_form()).await.unwrap();

    assert_eq!(deps.records.profile_count(), 1);
    assert_eq!(deps.log.count("upsert_profile"), 1);
    assert_eq!(deps.log.count("attach_documents"), 2);
    // Re-uploads overwrite the same objects
    assert_eq!(deps.storage.object_count(), 3);
}

#[tokio::test]
async fn test_reset_runs_again_with_fresh_budget() {
    let deps = TestDependencies::new().mock_auth(|auth| auth.fail_sign_up(3));
    let orchestrator = orchestrator(&deps);
    let form = complete_form();

    orchestrator.submit(&form).await.unwrap_err();
    assert_eq!(orchestrator.attempt().phase, RegistrationPhase::Failed);

    // Submit is only valid from idle
    let err = orchestrator.submit(&form).await.unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::InvalidState {
            phase: RegistrationPhase::Failed,
            ..
        }
    ));

    orchestrator.reset_and_retry(&form).await.unwrap();

    let attempt = orchestrator.attempt();
    assert_eq!(attempt.phase, RegistrationPhase::Complete);
    assert_eq!(attempt.retry_attempt, 0);
    assert_eq!(deps.auth.credential_count(), 1);
}

#[tokio::test]
async fn test_reset_requires_failed_run() {
    let deps = TestDependencies::new();
    let orchestrator = orchestrator(&deps);

    let err = orchestrator.reset_and_retry(&complete_form()).await.unwrap_err();

    assert!(matches!(
        err,
        RegistrationError::InvalidState {
            phase: RegistrationPhase::Idle,
            ..
        }
    ));
}

// ============================================================================
// Preflight validation
// ============================================================================

#[tokio::test]
async fn test_oversized_certificate_rejected_before_backend_calls() {
    let deps = TestDependencies::new();
    let orchestrator = orchestrator(&deps);
    let mut form = complete_form();
    form.certificate = Some(DocumentFile::new(
        "licence.pdf",
        Some("application/pdf"),
        Bytes::from(vec![0u8; 6 * 1024 * 1024]),
    ));
    assert!(6 * 1024 * 1024 > MAX_DOCUMENT_BYTES);

    let err = orchestrator.submit(&form).await.unwrap_err();

    assert!(matches!(
        err,
        RegistrationError::Validation {
            step: WizardStep::Documents,
            ..
        }
    ));
    assert!(deps.log.calls().is_empty());
    assert_eq!(orchestrator.attempt().phase, RegistrationPhase::Idle);
}

// ============================================================================
// Progress reporting
// ============================================================================

#[tokio::test]
async fn test_progress_snapshots_are_monotonic_and_bounded() {
    let deps = TestDependencies::new();
    let topic = "registration:progress-test";
    let orchestrator =
        RegistrationOrchestrator::new(deps.into_server_deps(), RetryPolicy::immediate(3))
            .with_topic(topic);
    let mut rx = deps.stream_hub.subscribe(topic).await;

    orchestrator.submit(&complete_form()).await.unwrap();

    let mut percents = Vec::new();
    let mut completed = None;
    while let Ok(message) = rx.try_recv() {
        match message["type"].as_str() {
            Some("attempt") => {
                let attempt: RegistrationAttempt =
                    serde_json::from_value(message["data"].clone()).unwrap();
                assert!(attempt.upload_progress <= 100);
                percents.push(attempt.display_percent());
            }
            Some("complete") => completed = Some(message["data"].clone()),
            other => panic!("unexpected message type {:?}", other),
        }
    }

    assert!(percents.len() >= 5, "percents: {:?}", percents);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "percents: {:?}", percents);
    assert_eq!(percents.last(), Some(&100));
    assert!(percents.iter().all(|p| *p <= 100));
    assert_eq!(completed.unwrap()["next"], "/login");
}

#[tokio::test]
async fn test_watch_channel_reports_final_state() {
    let deps = TestDependencies::new();
    let orchestrator = orchestrator(&deps);
    let rx = orchestrator.subscribe();

    orchestrator.submit(&complete_form()).await.unwrap();

    assert_eq!(rx.borrow().phase, RegistrationPhase::Complete);
    assert_eq!(rx.borrow().display_percent(), 100);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_second_submit_while_running_is_rejected() {
    let deps = TestDependencies::new().mock_auth(|auth| auth.fail_sign_up(1));
    let orchestrator = Arc::new(RegistrationOrchestrator::new(
        deps.into_server_deps(),
        RetryPolicy::new(3, Duration::from_millis(200)),
    ));
    let form = complete_form();

    let running = {
        let orchestrator = orchestrator.clone();
        let form = form.clone();
        tokio::spawn(async move { orchestrator.submit(&form).await })
    };

    // Wait for the first run to reach its backoff sleep
    for _ in 0..100 {
        if orchestrator.is_busy() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(orchestrator.is_busy());

    let err = orchestrator.submit(&form).await.unwrap_err();
    assert!(matches!(err, RegistrationError::AlreadyInProgress));

    running.await.unwrap().unwrap();
    assert!(!orchestrator.is_busy());
    assert_eq!(deps.auth.credential_count(), 1);
}

#[tokio::test]
async fn test_cancelled_run_fails_and_can_be_reset() {
    let deps = TestDependencies::new().mock_auth(|auth| auth.fail_sign_up(1));
    let orchestrator = RegistrationOrchestrator::new(
        deps.into_server_deps(),
        RetryPolicy::new(3, Duration::from_secs(60)),
    );
    let form = complete_form();

    // Dropped while waiting out the first backoff
    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), orchestrator.submit(&form)).await;
    assert!(cancelled.is_err());

    let attempt = orchestrator.attempt();
    assert!(!orchestrator.is_busy());
    assert_eq!(attempt.phase, RegistrationPhase::Failed);
    assert_eq!(attempt.failed_phase, Some(RegistrationPhase::CreatingAuth));
    assert_eq!(attempt.last_error.as_deref(), Some(INTERRUPTED_ERROR));
    assert!(attempt.can_reset());

    let err = orchestrator.submit(&form).await.unwrap_err();
    assert!(matches!(err, RegistrationError::InvalidState { .. }));

    orchestrator.reset_and_retry(&form).await.unwrap();
    assert_eq!(orchestrator.attempt().phase, RegistrationPhase::Complete);
    assert_eq!(deps.auth.credential_count(), 1);
}
