//! Signed-in sessions.
//!
//! The CLI keeps one session in a JSON file. The HTTP facade keeps one
//! [`UserSession`] per bearer token, each with its own loaded watch-state cache.

use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::clients::supabase_auth::{AuthError, AuthSession, SupabaseAuthClient};
use crate::domain::UserId;
use crate::domain::events::WatchStateEvent;
use crate::services::watch_state_impl::RemoteWatchStateService;
use crate::services::watch_state_service::{WatchStateError, WatchStateService};
use crate::store::{MemoryStore, PostgrestStore, RemoteStore, Store};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing or invalid session")]
    Unauthorized,

    #[error(transparent)]
    Auth(AuthError),

    #[error(transparent)]
    WatchState(#[from] WatchStateError),
}

impl From<AuthError> for SessionError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized | AuthError::InvalidCredentials => Self::Unauthorized,
            other => Self::Auth(other),
        }
    }
}

/// Session persisted between CLI invocations.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<config_dir>/sceneburn/session.json`
    pub fn default_location() -> anyhow::Result<Self> {
        let dir = dirs::config_dir().context("Could not determine the config directory")?;
        Ok(Self::new(dir.join("sceneburn").join("session.json")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<Option<AuthSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {}", self.path.display()))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", self.path.display()))?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &AuthSession) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;
        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    /// Returns whether a session file existed.
    pub fn clear(&self) -> anyhow::Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove session file: {}", self.path.display()))?;
        Ok(true)
    }

    /// Loads the stored session, refreshing and re-saving it when expired.
    pub async fn fresh(&self, auth: &SupabaseAuthClient) -> anyhow::Result<AuthSession> {
        let session = self
            .load()?
            .context("Not signed in. Run `sceneburn login <email>` first.")?;

        if !session.is_expired() {
            return Ok(session);
        }

        info!("Session expired, refreshing");
        let refreshed = auth
            .refresh_session(&session.refresh_token)
            .await
            .context("Session could not be refreshed. Run `sceneburn login <email>` again.")?;
        self.save(&refreshed)?;
        Ok(refreshed)
    }
}

/// Where sessions come from: who a token belongs to, and which store acts
/// on that user's behalf.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn resolve_user(&self, token: &str) -> Result<UserId, SessionError>;

    fn store_for(&self, token: &str) -> Arc<dyn RemoteStore>;

    async fn sign_out(&self, _token: &str) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Supabase auth plus PostgREST requests carrying the user's token, so that
/// row-level security applies.
pub struct SupabaseBackend {
    auth: SupabaseAuthClient,
    rest: PostgrestStore,
}

impl SupabaseBackend {
    #[must_use]
    pub const fn new(auth: SupabaseAuthClient, rest: PostgrestStore) -> Self {
        Self { auth, rest }
    }
}

#[async_trait::async_trait]
impl Backend for SupabaseBackend {
    async fn resolve_user(&self, token: &str) -> Result<UserId, SessionError> {
        Ok(self.auth.get_user(token).await?.id)
    }

    fn store_for(&self, token: &str) -> Arc<dyn RemoteStore> {
        Arc::new(self.rest.clone().with_access_token(token))
    }

    async fn sign_out(&self, token: &str) -> Result<(), SessionError> {
        Ok(self.auth.sign_out(token).await?)
    }
}

/// Fixed token table over a shared [`MemoryStore`]. Used offline and in tests.
pub struct MemoryBackend {
    store: Arc<MemoryStore>,
    tokens: RwLock<HashMap<String, UserId>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    pub async fn register(&self, token: impl Into<String>, user_id: UserId) {
        self.tokens.write().await.insert(token.into(), user_id);
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.tokens.write().await.remove(token).is_some()
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    async fn resolve_user(&self, token: &str) -> Result<UserId, SessionError> {
        self.tokens
            .read()
            .await
            .get(token)
            .copied()
            .ok_or(SessionError::Unauthorized)
    }

    fn store_for(&self, _token: &str) -> Arc<dyn RemoteStore> {
        self.store.clone()
    }
}

pub struct UserSession {
    pub user_id: UserId,
    pub watch_state: Arc<dyn WatchStateService>,
}

struct Entry {
    session: Arc<UserSession>,
    last_used: u64,
    validated_at: Instant,
}

/// Bearer token to loaded session, evicting the least recently used one
/// beyond `max_sessions`. A token older than `revalidate_after` is checked
/// with the backend again before its session is handed out.
pub struct SessionRegistry {
    backend: Arc<dyn Backend>,
    sessions: Mutex<HashMap<String, Entry>>,
    clock: AtomicU64,
    max_sessions: usize,
    revalidate_after: Duration,
    event_bus: broadcast::Sender<WatchStateEvent>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        max_sessions: usize,
        event_bus: broadcast::Sender<WatchStateEvent>,
    ) -> Self {
        Self {
            backend,
            sessions: Mutex::new(HashMap::new()),
            clock: AtomicU64::new(0),
            max_sessions: max_sessions.max(1),
            revalidate_after: Duration::from_secs(60),
            event_bus,
        }
    }

    #[must_use]
    pub const fn with_revalidate_after(mut self, revalidate_after: Duration) -> Self {
        self.revalidate_after = revalidate_after;
        self
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Returns the session for `token`, signing it in and loading its watch
    /// state on first use.
    pub async fn resolve(&self, token: &str) -> Result<Arc<UserSession>, SessionError> {
        let cached = {
            let mut sessions = self.sessions.lock().await;
            sessions.get_mut(token).map(|entry| {
                entry.last_used = self.tick();
                (
                    entry.session.clone(),
                    entry.validated_at.elapsed() >= self.revalidate_after,
                )
            })
        };
        match cached {
            Some((session, false)) => return Ok(session),
            Some((session, true)) => return self.revalidate(token, session).await,
            None => {}
        }

        let user_id = self.backend.resolve_user(token).await?;
        let store = Store::new(self.backend.store_for(token));
        let watch_state = Arc::new(RemoteWatchStateService::new(
            user_id,
            store,
            self.event_bus.clone(),
        ));
        watch_state.load().await?;

        let session = Arc::new(UserSession {
            user_id,
            watch_state,
        });

        let evicted = {
            let mut sessions = self.sessions.lock().await;
            if let Some(existing) = sessions.get_mut(token) {
                existing.last_used = self.tick();
                return Ok(existing.session.clone());
            }
            sessions.insert(
                token.to_string(),
                Entry {
                    session: session.clone(),
                    last_used: self.tick(),
                    validated_at: Instant::now(),
                },
            );
            self.evict_excess(&mut sessions)
        };

        for stale in evicted {
            stale.watch_state.clear().await;
        }
        info!(user_id = %user_id, "Session opened");
        Ok(session)
    }

    /// Re-checks a cached token. A rejected token, or one now naming another
    /// user, loses its session.
    async fn revalidate(
        &self,
        token: &str,
        session: Arc<UserSession>,
    ) -> Result<Arc<UserSession>, SessionError> {
        let still_valid = match self.backend.resolve_user(token).await {
            Ok(user_id) => user_id == session.user_id,
            Err(SessionError::Unauthorized) => false,
            Err(e) => return Err(e),
        };

        if still_valid {
            if let Some(entry) = self.sessions.lock().await.get_mut(token)
                && Arc::ptr_eq(&entry.session, &session)
            {
                entry.validated_at = Instant::now();
            }
            return Ok(session);
        }

        let removed = {
            let mut sessions = self.sessions.lock().await;
            let current = sessions
                .get(token)
                .is_some_and(|entry| Arc::ptr_eq(&entry.session, &session));
            if current { sessions.remove(token) } else { None }
        };
        if let Some(entry) = removed {
            entry.session.watch_state.clear().await;
        }
        info!(user_id = %session.user_id, "Session expired");
        Err(SessionError::Unauthorized)
    }

    fn evict_excess(&self, sessions: &mut HashMap<String, Entry>) -> Vec<Arc<UserSession>> {
        let mut evicted = Vec::new();
        while sessions.len() > self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(token, _)| token.clone())
            else {
                break;
            };
            if let Some(entry) = sessions.remove(&oldest) {
                debug!(user_id = %entry.session.user_id, "Session evicted");
                evicted.push(entry.session);
            }
        }
        evicted
    }

    /// Drops the session and revokes the token upstream.
    pub async fn sign_out(&self, token: &str) -> Result<bool, SessionError> {
        let removed = self.sessions.lock().await.remove(token);
        let existed = removed.is_some();
        if let Some(entry) = removed {
            entry.session.watch_state.clear().await;
            info!(user_id = %entry.session.user_id, "Session closed");
        }

        if let Err(e) = self.backend.sign_out(token).await {
            warn!(error = %e, "Upstream sign-out failed");
            return Err(e);
        }
        Ok(existed)
    }
}
