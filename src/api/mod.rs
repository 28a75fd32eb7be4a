use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, patch, post, put},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domain::events::WatchStateEvent;
use crate::services::{CatalogService, SessionRegistry};
use crate::state::SharedState;

pub mod auth;
mod collection;
mod diary;
mod error;
pub mod events;
mod observability;
mod search;
mod system;
mod titles;
mod tv;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.shared.catalog
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.shared.sessions
    }

    #[must_use]
    pub fn event_bus(&self) -> &tokio::sync::broadcast::Sender<WatchStateEvent> {
        &self.shared.event_bus
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.shared.config.read().await.server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/system/health/live", get(system::health_live))
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new().nest("/api", api_router).layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(observability::track_metrics))
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer.allow_methods(Any).allow_headers(Any)),
    )
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/titles/{media_type}/{id}",
            get(titles::get_title).delete(titles::delete_title_data),
        )
        .route("/titles/{media_type}/{id}/state", get(titles::get_state))
        .route("/titles/{media_type}/{id}/like", post(titles::toggle_like))
        .route(
            "/titles/{media_type}/{id}/watchlist",
            post(titles::toggle_watchlist),
        )
        .route("/titles/{media_type}/{id}/rating", put(titles::set_rating))
        .route("/collection/watched", get(collection::list_watched))
        .route("/diary/movies", post(diary::log_movie))
        .route(
            "/diary/movies/{entry_id}",
            patch(diary::update_movie_entry).delete(diary::delete_movie_entry),
        )
        .route("/reviews", post(diary::write_review))
        .route("/tv/{id}/seasons/{season}", get(tv::get_season))
        .route(
            "/tv/{id}/seasons/{season}/rollup",
            get(tv::get_season_rollup),
        )
        .route(
            "/tv/{id}/seasons/{season}/rating",
            put(tv::set_season_rating),
        )
        .route(
            "/tv/{id}/seasons/{season}/episodes/{episode}/watched",
            post(tv::toggle_episode_watched),
        )
        .route("/tv/{id}/reviews/seasons", get(tv::get_season_reviews))
        .route("/search", get(search::search_titles))
        .route("/session", get(auth::current_session))
        .route("/session/sign-out", post(auth::sign_out))
        .route("/metrics", get(observability::get_metrics))
        .merge(events::router())
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
