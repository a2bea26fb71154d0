//! In-memory registry of signup wizard sessions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use super::registration::{
    RegistrationError, RegistrationOrchestrator, RegistrationSuccess, RetryPolicy,
};
use super::wizard::RegistrationWizard;
use crate::common::SessionId;
use crate::domains::documents::PreviewRegistry;
use crate::kernel::stream_hub::registration_topic;
use crate::kernel::ServerDeps;

/// Sessions untouched for this long are discarded with their previews.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// A wizard paired with the orchestrator that will submit it.
pub struct RegistrationSession {
    pub id: SessionId,
    pub wizard: Mutex<RegistrationWizard>,
    pub orchestrator: RegistrationOrchestrator,
    last_touched: std::sync::Mutex<Instant>,
}

impl RegistrationSession {
    fn touch(&self) {
        *self
            .last_touched
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_touched
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .elapsed()
    }
}

#[derive(Clone)]
pub struct RegistrationSessions {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<RegistrationSession>>>>,
    deps: Arc<ServerDeps>,
    previews: PreviewRegistry,
    policy: RetryPolicy,
}

impl RegistrationSessions {
    pub fn new(deps: Arc<ServerDeps>, previews: PreviewRegistry, policy: RetryPolicy) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            deps,
            previews,
            policy,
        }
    }

    pub async fn create(&self) -> Arc<RegistrationSession> {
        let id = SessionId::new();
        let session = Arc::new(RegistrationSession {
            id,
            wizard: Mutex::new(RegistrationWizard::new(self.previews.clone())),
            orchestrator: RegistrationOrchestrator::new(self.deps.clone(), self.policy)
                .with_topic(registration_topic(id)),
            last_touched: std::sync::Mutex::new(Instant::now()),
        });
        self.sessions.write().await.insert(id, session.clone());
        info!(session_id = %id, "Registration session created");
        session
    }

    /// Look up a session and mark it as used.
    pub async fn get(&self, id: SessionId) -> Option<Arc<RegistrationSession>> {
        let session = self.sessions.read().await.get(&id).cloned()?;
        session.touch();
        Some(session)
    }

    /// Abandon a session. Its previews are released with the wizard.
    pub async fn remove(&self, id: SessionId) -> Option<Arc<RegistrationSession>> {
        self.sessions.write().await.remove(&id)
    }

    /// Discard sessions idle for at least `idle_timeout`, releasing their
    /// previews. Sessions with a submission in flight are kept.
    pub async fn expire_idle(&self, idle_timeout: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = session.orchestrator.is_busy() || session.idle_for() < idle_timeout;
            if !keep {
                debug!(session_id = %id, "Registration session expired");
            }
            keep
        });
        let expired = before - sessions.len();
        drop(sessions);

        if expired > 0 {
            info!(expired, "Expired idle registration sessions");
            self.deps.stream_hub.cleanup().await;
        }
        expired
    }

    /// Sweep idle sessions in the background for the life of the server.
    pub fn spawn_expiry(&self, idle_timeout: Duration) -> JoinHandle<()> {
        let sessions = self.clone();
        let period = (idle_timeout / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                sessions.expire_idle(idle_timeout).await;
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Submit the session's form. The session is discarded once the
    /// provider is registered.
    pub async fn submit(
        &self,
        session: &RegistrationSession,
    ) -> Result<RegistrationSuccess, RegistrationError> {
        let form = session.wizard.lock().await.form().clone();
        let success = session.orchestrator.submit(&form).await?;
        self.remove(session.id).await;
        Ok(success)
    }

    /// Manual reset-and-retry after a failed submission.
    pub async fn reset_and_retry(
        &self,
        session: &RegistrationSession,
    ) -> Result<RegistrationSuccess, RegistrationError> {
        let form = session.wizard.lock().await.form().clone();
        let success = session.orchestrator.reset_and_retry(&form).await?;
        self.remove(session.id).await;
        Ok(success)
    }
}
