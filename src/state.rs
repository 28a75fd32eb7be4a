use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};

use crate::clients::supabase_auth::SupabaseAuthClient;
use crate::clients::tmdb::TmdbClient;
use crate::config::Config;
use crate::domain::events::WatchStateEvent;
use crate::services::{
    Backend, CatalogService, ImageService, MemoryBackend, SessionRegistry, SupabaseBackend,
};
use crate::store::PostgrestStore;

/// Build a shared HTTP client with reasonable defaults for API calls.
/// This client should be reused across all HTTP-based services to enable
/// connection pooling.
pub fn build_shared_http_client(timeout_seconds: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_seconds))
        .user_agent(concat!("SceneBurn/", env!("CARGO_PKG_VERSION")))
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build shared HTTP client: {e}"))
}

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub http: reqwest::Client,

    pub catalog: Arc<CatalogService>,

    pub sessions: Arc<SessionRegistry>,

    pub event_bus: broadcast::Sender<WatchStateEvent>,
}

impl SharedState {
    /// Sessions resolved against Supabase auth, rows read through PostgREST.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = build_shared_http_client(config.supabase.request_timeout_seconds.into())?;
        let auth = SupabaseAuthClient::new(
            http.clone(),
            &config.supabase.url,
            config.supabase.anon_key.clone(),
        )?;
        let rest = PostgrestStore::new(
            http.clone(),
            &config.supabase.url,
            config.supabase.anon_key.clone(),
        )?;
        let backend = Arc::new(SupabaseBackend::new(auth, rest));
        Ok(Self::with_backend(config, http, backend))
    }

    /// Every session shares the backend's in-memory store.
    pub fn offline(config: Config, backend: Arc<MemoryBackend>) -> anyhow::Result<Self> {
        let http = build_shared_http_client(config.tmdb.request_timeout_seconds.into())?;
        Ok(Self::with_backend(config, http, backend))
    }

    pub fn with_backend(
        config: Config,
        http: reqwest::Client,
        backend: Arc<dyn Backend>,
    ) -> Self {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size.max(1));

        let tmdb = Arc::new(TmdbClient::new(http.clone(), &config.tmdb));
        if !tmdb.is_configured() {
            tracing::warn!("No TMDB credentials configured; catalog lookups will fail");
        }
        let catalog = Arc::new(CatalogService::new(tmdb, ImageService::new(&config.tmdb)));

        let sessions = Arc::new(
            SessionRegistry::new(backend, config.server.max_sessions, event_bus.clone())
                .with_revalidate_after(Duration::from_secs(
                    config.server.session_revalidate_seconds,
                )),
        );

        Self {
            config: Arc::new(RwLock::new(config)),
            http,
            catalog,
            sessions,
            event_bus,
        }
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
