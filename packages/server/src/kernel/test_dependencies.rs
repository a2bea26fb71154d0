// TestDependencies - mock implementations for testing
//
// Provides in-memory services that can be injected into ServerDeps for tests.
// Every mock records its calls on a shared CallLog so tests can assert on
// ordering across services, and each supports failure injection.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{
    AuthenticatedUser, BaseAuthService, BaseBlobStorage, BaseRecordStore, BaseVoiceSdk,
    ServerDeps, SignUpOutcome, StreamHub, VoiceCall,
};
use crate::common::{AppointmentId, PatientId, UserId};
use crate::domains::prescreening::models::{Prescreening, PrescreeningStatus};
use crate::domains::providers::models::{NewProviderProfile, ProviderDocuments, ProviderProfile};

// =============================================================================
// Shared helpers
// =============================================================================

/// Ordered record of calls made against the mocks.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Calls whose name starts with `prefix` (e.g. "sign_up").
    pub fn count(&self, prefix: &str) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Index of the first call starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .position(|c| c.starts_with(prefix))
    }
}

/// Number of upcoming calls that should fail.
#[derive(Default)]
struct FailureBudget(Mutex<u32>);

impl FailureBudget {
    fn set(&self, n: u32) {
        *self.0.lock().unwrap() = n;
    }

    fn take(&self) -> bool {
        let mut remaining = self.0.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

// =============================================================================
// Mock Auth Service
// =============================================================================

pub struct MockAuthService {
    log: CallLog,
    credentials: Mutex<HashMap<String, (String, AuthenticatedUser)>>,
    tokens: Mutex<HashMap<String, AuthenticatedUser>>,
    sign_up_failures: FailureBudget,
    commit_then_fail: FailureBudget,
}

impl MockAuthService {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            credentials: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
            sign_up_failures: FailureBudget::default(),
            commit_then_fail: FailureBudget::default(),
        }
    }

    /// The next `n` sign-ups fail without creating a credential.
    pub fn fail_sign_up(self, n: u32) -> Self {
        self.sign_up_failures.set(n);
        self
    }

    /// The next `n` sign-ups create the credential and then report an error,
    /// as if the response was lost in transit.
    pub fn commit_then_fail(self, n: u32) -> Self {
        self.commit_then_fail.set(n);
        self
    }

    /// Register a bearer token resolving to a user.
    pub fn with_token(self, token: &str, user: AuthenticatedUser) -> Self {
        self.tokens.lock().unwrap().insert(token.to_string(), user);
        self
    }

    pub fn credential_count(&self) -> usize {
        self.credentials.lock().unwrap().len()
    }

    pub fn user_for(&self, email: &str) -> Option<AuthenticatedUser> {
        self.credentials
            .lock()
            .unwrap()
            .get(email)
            .map(|(_, user)| user.clone())
    }
}

impl Default for MockAuthService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAuthService for MockAuthService {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _metadata: serde_json::Value,
    ) -> Result<SignUpOutcome> {
        self.log.record(format!("sign_up:{}", email));

        if self.sign_up_failures.take() {
            anyhow::bail!("auth service unavailable");
        }

        let mut credentials = self.credentials.lock().unwrap();
        if credentials.contains_key(email) {
            return Ok(SignUpOutcome::AlreadyRegistered);
        }

        let user = AuthenticatedUser {
            id: UserId::new(),
            email: Some(email.to_string()),
            role: Some("authenticated".to_string()),
        };
        credentials.insert(email.to_string(), (password.to_string(), user.clone()));

        if self.commit_then_fail.take() {
            anyhow::bail!("connection reset after sign-up");
        }

        Ok(SignUpOutcome::Created(user))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser> {
        self.log.record(format!("sign_in:{}", email));

        let credentials = self.credentials.lock().unwrap();
        match credentials.get(email) {
            Some((stored, user)) if stored == password => Ok(user.clone()),
            _ => anyhow::bail!("Invalid login credentials"),
        }
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthenticatedUser>> {
        Ok(self.tokens.lock().unwrap().get(access_token).cloned())
    }
}

// =============================================================================
// In-memory Record Store
// =============================================================================

pub struct InMemoryRecordStore {
    log: CallLog,
    profiles: Mutex<HashMap<UserId, ProviderProfile>>,
    prescreenings: Mutex<HashMap<(PatientId, AppointmentId), Prescreening>>,
    prescreening_reads: Mutex<usize>,
    upsert_failures: FailureBudget,
    attach_failures: FailureBudget,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            profiles: Mutex::new(HashMap::new()),
            prescreenings: Mutex::new(HashMap::new()),
            prescreening_reads: Mutex::new(0),
            upsert_failures: FailureBudget::default(),
            attach_failures: FailureBudget::default(),
        }
    }

    /// The next `n` profile upserts fail.
    pub fn fail_upsert(self, n: u32) -> Self {
        self.upsert_failures.set(n);
        self
    }

    /// The next `n` document attachments fail.
    pub fn fail_attach(self, n: u32) -> Self {
        self.attach_failures.set(n);
        self
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }

    pub fn profile(&self, user_id: UserId) -> Option<ProviderProfile> {
        self.profiles.lock().unwrap().get(&user_id).cloned()
    }

    pub fn prescreening_reads(&self) -> usize {
        *self.prescreening_reads.lock().unwrap()
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRecordStore for InMemoryRecordStore {
    async fn upsert_provider_profile(
        &self,
        profile: &NewProviderProfile,
    ) -> Result<ProviderProfile> {
        self.log.record(format!("upsert_profile:{}", profile.user_id));

        if self.upsert_failures.take() {
            anyhow::bail!("record store timeout");
        }

        let now = Utc::now();
        let mut profiles = self.profiles.lock().unwrap();
        let existing = profiles.get(&profile.user_id);
        let row = ProviderProfile {
            user_id: profile.user_id,
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            provider_type: profile.provider_type,
            registration_number: profile.registration_number.clone(),
            registration_expiry: profile.registration_expiry,
            specializations: profile.specializations.clone(),
            services: profile.services.clone(),
            biography: profile.biography.clone(),
            availability: profile.availability,
            profile_picture_url: existing.and_then(|p| p.profile_picture_url.clone()),
            certificate_url: existing.and_then(|p| p.certificate_url.clone()),
            signature_url: existing.and_then(|p| p.signature_url.clone()),
            status: profile.status,
            created_at: existing.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        };
        profiles.insert(profile.user_id, row.clone());
        Ok(row)
    }

    async fn attach_provider_documents(
        &self,
        user_id: UserId,
        documents: &ProviderDocuments,
    ) -> Result<ProviderProfile> {
        self.log.record(format!("attach_documents:{}", user_id));

        if self.attach_failures.take() {
            anyhow::bail!("record store timeout");
        }

        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(&user_id)
            .with_context(|| format!("no provider profile for user {}", user_id))?;
        if let Some(url) = &documents.profile_picture_url {
            profile.profile_picture_url = Some(url.clone());
        }
        if let Some(url) = &documents.certificate_url {
            profile.certificate_url = Some(url.clone());
        }
        if let Some(url) = &documents.signature_url {
            profile.signature_url = Some(url.clone());
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn find_provider_profile(&self, user_id: UserId) -> Result<Option<ProviderProfile>> {
        Ok(self.profile(user_id))
    }

    async fn find_prescreening(
        &self,
        patient_id: PatientId,
        appointment_id: AppointmentId,
    ) -> Result<Option<Prescreening>> {
        *self.prescreening_reads.lock().unwrap() += 1;
        Ok(self
            .prescreenings
            .lock()
            .unwrap()
            .get(&(patient_id, appointment_id))
            .cloned())
    }

    async fn set_prescreening_status(
        &self,
        patient_id: PatientId,
        appointment_id: AppointmentId,
        status: PrescreeningStatus,
    ) -> Result<Prescreening> {
        self.log.record(format!("set_prescreening:{}", status));

        let row = Prescreening {
            patient_id,
            appointment_id,
            status,
            updated_at: Utc::now(),
        };
        self.prescreenings
            .lock()
            .unwrap()
            .insert((patient_id, appointment_id), row.clone());
        Ok(row)
    }
}

// =============================================================================
// Mock Blob Storage
// =============================================================================

pub struct MockBlobStorage {
    log: CallLog,
    objects: Mutex<HashMap<String, (String, Bytes)>>,
    failures: FailureBudget,
}

impl MockBlobStorage {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            objects: Mutex::new(HashMap::new()),
            failures: FailureBudget::default(),
        }
    }

    /// The next `n` uploads fail.
    pub fn fail_upload(self, n: u32) -> Self {
        self.failures.set(n);
        self
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Content type of the object stored at `path`.
    pub fn content_type(&self, path: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .map(|(content_type, _)| content_type.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl Default for MockBlobStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseBlobStorage for MockBlobStorage {
    async fn upload(&self, path: &str, content_type: &str, data: Bytes) -> Result<String> {
        self.log.record(format!("upload:{}", path));

        if self.failures.take() {
            anyhow::bail!("storage returned 503");
        }

        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), (content_type.to_string(), data));
        Ok(format!("https://storage.test/{}", path))
    }
}

// =============================================================================
// Mock Voice SDK
// =============================================================================

pub struct MockVoiceSdk {
    log: CallLog,
    next_call: Mutex<u32>,
    start_failures: FailureBudget,
}

impl MockVoiceSdk {
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            next_call: Mutex::new(0),
            start_failures: FailureBudget::default(),
        }
    }

    pub fn fail_start(self, n: u32) -> Self {
        self.start_failures.set(n);
        self
    }

    pub fn stopped(&self) -> Vec<String> {
        self.log
            .calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("stop_call:").map(str::to_string))
            .collect()
    }
}

impl Default for MockVoiceSdk {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseVoiceSdk for MockVoiceSdk {
    async fn start_session(&self, assistant_id: &str) -> Result<VoiceCall> {
        self.log.record(format!("start_call:{}", assistant_id));

        if self.start_failures.take() {
            anyhow::bail!("Vapi API error 401 Unauthorized");
        }

        let mut next = self.next_call.lock().unwrap();
        *next += 1;
        Ok(VoiceCall {
            id: format!("call-{}", next),
            assistant_id: assistant_id.to_string(),
        })
    }

    async fn stop_session(&self, call_id: &str) -> Result<()> {
        self.log.record(format!("stop_call:{}", call_id));
        Ok(())
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub log: CallLog,
    pub auth: Arc<MockAuthService>,
    pub records: Arc<InMemoryRecordStore>,
    pub storage: Arc<MockBlobStorage>,
    pub voice: Arc<MockVoiceSdk>,
    pub stream_hub: StreamHub,
}

impl TestDependencies {
    pub fn new() -> Self {
        let log = CallLog::new();
        Self {
            auth: Arc::new(MockAuthService::with_log(log.clone())),
            records: Arc::new(InMemoryRecordStore::with_log(log.clone())),
            storage: Arc::new(MockBlobStorage::with_log(log.clone())),
            voice: Arc::new(MockVoiceSdk::with_log(log.clone())),
            stream_hub: StreamHub::new(),
            log,
        }
    }

    /// Replace the auth mock; `configure` receives a fresh mock on the shared log.
    pub fn mock_auth(mut self, configure: impl FnOnce(MockAuthService) -> MockAuthService) -> Self {
        self.auth = Arc::new(configure(MockAuthService::with_log(self.log.clone())));
        self
    }

    pub fn mock_records(
        mut self,
        configure: impl FnOnce(InMemoryRecordStore) -> InMemoryRecordStore,
    ) -> Self {
        self.records = Arc::new(configure(InMemoryRecordStore::with_log(self.log.clone())));
        self
    }

    pub fn mock_storage(
        mut self,
        configure: impl FnOnce(MockBlobStorage) -> MockBlobStorage,
    ) -> Self {
        self.storage = Arc::new(configure(MockBlobStorage::with_log(self.log.clone())));
        self
    }

    pub fn mock_voice(mut self, configure: impl FnOnce(MockVoiceSdk) -> MockVoiceSdk) -> Self {
        self.voice = Arc::new(configure(MockVoiceSdk::with_log(self.log.clone())));
        self
    }

    /// Convert into ServerDeps for testing
    pub fn into_server_deps(&self) -> Arc<ServerDeps> {
        Arc::new(ServerDeps::new(
            self.auth.clone(),
            self.records.clone(),
            self.storage.clone(),
            Some(self.voice.clone()),
            self.stream_hub.clone(),
        ))
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
