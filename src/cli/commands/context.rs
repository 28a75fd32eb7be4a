use anyhow::Context;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::clients::supabase_auth::SupabaseAuthClient;
use crate::clients::tmdb::TmdbClient;
use crate::config::Config;
use crate::domain::{MediaId, MediaType, UserId};
use crate::models::lists::TitleRef;
use crate::models::watch_state::UnifiedWatchState;
use crate::services::{
    CatalogService, ImageService, RemoteWatchStateService, SessionFile, WatchStateService,
};
use crate::state::build_shared_http_client;
use crate::store::{MemoryStore, PostgrestStore, Store};

/// Everything a signed-in command needs: the user's loaded watch state and
/// the catalog.
pub struct CliContext {
    pub offline: bool,
    pub store: Store,
    pub watch: RemoteWatchStateService,
    pub catalog: CatalogService,
}

impl CliContext {
    pub async fn open(config: &Config, offline: bool) -> anyhow::Result<Self> {
        let http = build_shared_http_client(config.supabase.request_timeout_seconds.into())?;

        let (user_id, store) = if offline {
            println!("Offline mode: changes live in memory for this run only.");
            let store = Store::new(Arc::new(MemoryStore::new()));
            (UserId::new(Uuid::nil()), store)
        } else {
            let auth = SupabaseAuthClient::new(
                http.clone(),
                &config.supabase.url,
                config.supabase.anon_key.clone(),
            )?;
            let session = SessionFile::default_location()?.fresh(&auth).await?;
            let rest = PostgrestStore::new(
                http.clone(),
                &config.supabase.url,
                config.supabase.anon_key.clone(),
            )?
            .with_access_token(session.access_token.clone());
            (session.user_id(), Store::new(Arc::new(rest)))
        };

        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size.max(1));
        let watch = RemoteWatchStateService::new(user_id, store.clone(), event_bus);
        watch
            .load()
            .await
            .context("Failed to load watch state")?;

        let tmdb = Arc::new(TmdbClient::new(http, &config.tmdb));
        let catalog = CatalogService::new(tmdb, ImageService::new(&config.tmdb));

        Ok(Self {
            offline,
            store,
            watch,
            catalog,
        })
    }

    /// Title facts for list and rating rows. Offline, an unreachable catalog
    /// falls back to a placeholder title.
    pub async fn title_ref(&self, media_type: MediaType, id: MediaId) -> anyhow::Result<TitleRef> {
        match self.catalog.title_ref(media_type, id).await {
            Ok(title) => Ok(title),
            Err(e) if self.offline => {
                warn!(media_id = %id, error = %e, "Catalog lookup failed, using placeholder title");
                Ok(TitleRef::new(id, format!("{media_type} {id}"), None, media_type))
            }
            Err(e) => Err(e).with_context(|| format!("Could not look up {media_type} {id}")),
        }
    }
}

pub fn print_state(id: MediaId, state: &UnifiedWatchState) {
    let flag = |on: bool| if on { "yes" } else { "no" };
    println!("Title {id}");
    println!("{:-<60}", "");
    println!("  Liked:        {}", flag(state.is_liked));
    println!("  Watchlisted:  {}", flag(state.is_in_watchlist));
    println!("  Watched:      {}", flag(state.is_watched));
    println!(
        "  Rating:       {}",
        state
            .rating
            .map_or_else(|| "-".to_string(), |r| format!("{r}/10"))
    );
}

pub fn parse_media_id(id: i64) -> anyhow::Result<MediaId> {
    anyhow::ensure!(id > 0, "Invalid title ID: {id}. ID must be a positive integer");
    Ok(MediaId::new(id))
}
