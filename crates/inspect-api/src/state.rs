//! Shared application state and the per-conversation session registry.
use std::collections::HashMap;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use inspect_agents::{InspectionSession, LlmClient, ReviewSession};
use inspect_out::ReportExporter;
use inspect_store::ReportService;
use tokio::sync::Mutex;

use crate::metrics::Metrics;

/// A conversation is identified by who is talking and which thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

/// Sessions keyed by conversation, each behind its own lock so turns of
/// one conversation run one at a time while others proceed.
pub struct SessionRegistry<K, S> {
    sessions: Mutex<HashMap<K, Entry<S>>>,
}

struct Entry<S> {
    session: Arc<Mutex<S>>,
    last_used: Instant,
}

impl<K: Eq + Hash, S> Default for SessionRegistry<K, S> {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, S> SessionRegistry<K, S> {
    /// The session for `key`, created with `create` on first use.
    pub async fn get_or_create(&self, key: K, create: impl FnOnce() -> S) -> Arc<Mutex<S>> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.entry(key).or_insert_with(|| Entry {
            session: Arc::new(Mutex::new(create())),
            last_used: Instant::now(),
        });
        entry.last_used = Instant::now();
        entry.session.clone()
    }

    pub async fn remove(&self, key: &K) -> bool {
        self.sessions.lock().await.remove(key).is_some()
    }

    /// Drop sessions unused for longer than `max_idle` as of `now`.
    /// Sessions whose turn is still running are kept.
    pub async fn evict_idle(&self, now: Instant, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            let in_use = Arc::strong_count(&entry.session) > 1;
            in_use || now.saturating_duration_since(entry.last_used) <= max_idle
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[derive(Clone)]
pub struct AppState {
    pub reports: ReportService,
    pub llm: Arc<dyn LlmClient>,
    pub exporter: Arc<ReportExporter>,
    pub generators: Arc<SessionRegistry<SessionKey, InspectionSession>>,
    pub reviewers: Arc<SessionRegistry<SessionKey, ReviewSession>>,
    pub metrics: Arc<Metrics>,
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(
        reports: ReportService,
        llm: Arc<dyn LlmClient>,
        exporter: ReportExporter,
        metrics: Metrics,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            reports,
            llm,
            exporter: Arc::new(exporter),
            generators: Arc::new(SessionRegistry::default()),
            reviewers: Arc::new(SessionRegistry::default()),
            metrics: Arc::new(metrics),
            upload_dir,
        }
    }

    pub fn new_generator(&self) -> InspectionSession {
        InspectionSession::new(self.llm.clone(), self.reports.clone())
    }

    pub fn new_reviewer(&self) -> ReviewSession {
        ReviewSession::new(self.llm.clone(), self.reports.clone())
    }

    /// Evict idle generator and reviewer sessions; returns how many went.
    pub async fn evict_idle_sessions(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let evicted = self.generators.evict_idle(now, max_idle).await
            + self.reviewers.evict_idle(now, max_idle).await;
        if evicted > 0 {
            tracing::info!(evicted, "Idle sessions evicted");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registry_reuses_sessions() {
        let registry: SessionRegistry<SessionKey, Vec<u8>> = SessionRegistry::default();
        let key = SessionKey::new("u1", "s1");

        registry.get_or_create(key.clone(), Vec::new).await.lock().await.push(1);
        let again = registry.get_or_create(key.clone(), || vec![9]).await;
        assert_eq!(*again.lock().await, vec![1]);

        registry.get_or_create(SessionKey::new("u1", "s2"), Vec::new).await;
        assert_eq!(registry.len().await, 2);

        assert!(registry.remove(&key).await);
        assert!(!registry.remove(&key).await);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let registry: SessionRegistry<SessionKey, Vec<u8>> = SessionRegistry::default();
        let idle = Duration::from_secs(60);
        registry.get_or_create(SessionKey::new("u1", "old"), Vec::new).await;
        let busy = registry.get_or_create(SessionKey::new("u1", "busy"), Vec::new).await;

        assert_eq!(registry.evict_idle(Instant::now(), idle).await, 0);
        assert_eq!(registry.len().await, 2);

        let later = Instant::now() + Duration::from_secs(120);
        assert_eq!(registry.evict_idle(later, idle).await, 1);
        assert_eq!(registry.len().await, 1);

        drop(busy);
        assert_eq!(registry.evict_idle(later, idle).await, 1);
        assert!(registry.is_empty().await);
    }
}
