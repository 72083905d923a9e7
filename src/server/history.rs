use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::mock::now_rfc3339;
use super::types::{SearchEntry, Session, Video, WatchEntry};
use crate::error::StoreError;

pub const DEFAULT_SESSION_ID: &str = "default";

// ── Storage seam ───────────────────────────────────────────────────────────────

/// Key-value backing for sessions. Swap the in-memory map for an external
/// cache or database by implementing this.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<Session>, StoreError>;

    async fn store(&self, session_id: &str, session: Session) -> Result<(), StoreError>;
}

/// Process-local sessions. Nothing expires and everything is lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn store(&self, session_id: &str, session: Session) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), session);
        Ok(())
    }
}

// ── Sessions – history rules on top of a store ─────────────────────────────────

/// Lazily creates sessions and keeps their history lists capped.
///
/// Each mutation is a load followed by a store, so two requests racing on the
/// same session id can lose one of the updates.
#[derive(Clone)]
pub struct Sessions {
    store: Arc<dyn SessionStore>,
    default_region: String,
    search_limit: usize,
    watch_limit: usize,
}

impl Sessions {
    pub fn new(
        store: Arc<dyn SessionStore>,
        default_region: impl Into<String>,
        search_limit: usize,
        watch_limit: usize,
    ) -> Self {
        Self {
            store,
            default_region: default_region.into(),
            search_limit,
            watch_limit,
        }
    }

    /// Blank or missing ids share the `default` session.
    pub fn resolve_id(session_id: Option<&str>) -> &str {
        session_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_SESSION_ID)
    }

    pub async fn get_or_create(&self, session_id: &str) -> Result<Session, StoreError> {
        if let Some(session) = self.store.load(session_id).await? {
            return Ok(session);
        }
        let session = Session::new(self.default_region.clone());
        self.store.store(session_id, session.clone()).await?;
        Ok(session)
    }

    /// Moves the session to `region` unless it is blank. Returns the session
    /// as stored.
    pub async fn set_region(&self, session_id: &str, region: &str) -> Result<Session, StoreError> {
        let mut session = self.get_or_create(session_id).await?;
        let region = region.trim();
        if !region.is_empty() && region != session.current_region {
            session.current_region = region.to_string();
            self.store.store(session_id, session.clone()).await?;
        }
        Ok(session)
    }

    /// Blank queries are not recorded.
    pub async fn record_search(&self, session_id: &str, query: &str, location: &str) -> Result<(), StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }
        let mut session = self.get_or_create(session_id).await?;
        session.push_search(
            SearchEntry {
                query: query.to_string(),
                location: location.to_string(),
                timestamp: now_rfc3339(),
            },
            self.search_limit,
        );
        self.store.store(session_id, session).await
    }

    pub async fn record_watch(&self, session_id: &str, video: &Video) -> Result<(), StoreError> {
        let mut session = self.get_or_create(session_id).await?;
        session.push_watch(
            WatchEntry {
                id: video.id.clone(),
                title: video.title.clone(),
                channel: video.channel_title.clone(),
                watched_at: now_rfc3339(),
                thumbnail: video.thumbnail.clone(),
            },
            self.watch_limit,
        );
        self.store.store(session_id, session).await
    }
}
