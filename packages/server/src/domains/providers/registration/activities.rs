//! Backend work for each registration phase. Each function is one attempt;
//! retrying is the machine's decision.

use anyhow::{Context, Result};
use bytes::Bytes;
use serde_json::json;
use tracing::{debug, info};

use crate::common::UserId;
use crate::domains::documents::{DocumentFile, DocumentKind};
use crate::domains::providers::data::RegistrationForm;
use crate::domains::providers::models::{NewProviderProfile, ProviderDocuments, ProviderProfile};
use crate::kernel::{ServerDeps, SignUpOutcome};

/// Phase 1: create the credential, or recover the user id if an earlier
/// run already created it.
pub async fn create_auth(form: &RegistrationForm, deps: &ServerDeps) -> Result<UserId> {
    let metadata = json!({
        "first_name": form.first_name.trim(),
        "last_name": form.last_name.trim(),
        "full_name": form.full_name(),
        "role": "provider",
        "provider_type": form.provider_type,
    });

    let outcome = deps
        .auth
        .sign_up(&form.email, form.password.expose(), metadata)
        .await
        .context("Failed to create auth credential")?;

    match outcome {
        SignUpOutcome::Created(user) => {
            info!(user_id = %user.id, "Auth credential created");
            Ok(user.id)
        }
        SignUpOutcome::AlreadyRegistered => {
            info!("Email already registered, signing in to recover user id");
            let user = deps
                .auth
                .sign_in_with_password(&form.email, form.password.expose())
                .await
                .context("Email is already registered and sign-in failed")?;
            Ok(user.id)
        }
    }
}

/// Phase 2: write every non-file field, keyed by user id.
pub async fn create_profile(
    user_id: UserId,
    form: &RegistrationForm,
    deps: &ServerDeps,
) -> Result<ProviderProfile> {
    let profile = NewProviderProfile::from_form(user_id, form)?;
    deps.records
        .upsert_provider_profile(&profile)
        .await
        .context("Failed to save provider profile")
}

/// Deterministic object path, so a retried upload overwrites its earlier copy.
pub fn document_path(user_id: UserId, kind: DocumentKind, file: &DocumentFile) -> String {
    format!("providers/{}/{}.{}", user_id, kind.as_str(), file.extension())
}

/// One file to send in phase 3.
#[derive(Debug, Clone)]
pub struct PlannedUpload {
    pub kind: DocumentKind,
    pub path: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Every document on the form, in upload order.
pub fn plan_uploads(user_id: UserId, form: &RegistrationForm) -> Result<Vec<PlannedUpload>> {
    let mut uploads = Vec::new();
    for kind in DocumentKind::ALL {
        let Some(file) = form.document(kind) else {
            if kind == DocumentKind::ProfilePicture || kind == DocumentKind::Certificate {
                anyhow::bail!("{} is missing from the registration form", kind);
            }
            continue;
        };
        uploads.push(PlannedUpload {
            kind,
            path: document_path(user_id, kind, file),
            content_type: file.content_type.clone(),
            data: file.data.clone(),
        });
    }
    Ok(uploads)
}

/// Total bytes of a plan; the denominator for upload progress.
pub fn total_bytes(uploads: &[PlannedUpload]) -> usize {
    uploads.iter().map(|u| u.data.len()).sum()
}

/// Percentage of `total` represented by `sent`, clamped to 0..=100.
pub fn progress_percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent.min(total) as u128 * 100) / total as u128) as u8
}

/// Phase 3, one file: returns the durable URL.
pub async fn upload_document(upload: &PlannedUpload, deps: &ServerDeps) -> Result<String> {
    debug!(kind = %upload.kind, path = %upload.path, bytes = upload.data.len(), "Uploading document");
    deps.storage
        .upload(&upload.path, &upload.content_type, upload.data.clone())
        .await
        .with_context(|| format!("Failed to upload {}", upload.kind))
}

/// Phase 3, final step: record the URLs on the profile.
pub async fn attach_documents(
    user_id: UserId,
    documents: &ProviderDocuments,
    deps: &ServerDeps,
) -> Result<ProviderProfile> {
    deps.records
        .attach_provider_documents(user_id, documents)
        .await
        .context("Failed to attach document URLs to provider profile")
}

/// Put an uploaded URL into the matching slot.
pub fn record_url(documents: &mut ProviderDocuments, kind: DocumentKind, url: String) {
    let slot = match kind {
        DocumentKind::ProfilePicture => &mut documents.profile_picture_url,
        DocumentKind::Certificate => &mut documents.certificate_url,
        DocumentKind::Signature => &mut documents.signature_url,
    };
    *slot = Some(url);
}
