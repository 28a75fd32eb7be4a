use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;
use tracing::warn;

use super::validation::{validate_episode_number, validate_media_id, validate_season_number};
use super::{
    ApiError, ApiResponse, AppState, EpisodeWatchedRequest, EpisodeWatchedResponse,
    SeasonRatingRequest, SeasonRatingResponse,
};
use crate::domain::EpisodeKey;
use crate::services::{SeasonReviewSummary, SeasonRollup, SeasonView, UserSession};

/// GET /tv/{id}/seasons/{season}
pub async fn get_season(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
    Path((id, season)): Path<(i64, i32)>,
) -> Result<Json<ApiResponse<SeasonView>>, ApiError> {
    let tv_id = validate_media_id(id)?;
    let season = validate_season_number(season)?;

    let view = state
        .catalog()
        .season_view(tv_id, season, session.watch_state.as_ref())
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

/// GET /tv/{id}/seasons/{season}/rollup
pub async fn get_season_rollup(
    Extension(session): Extension<Arc<UserSession>>,
    Path((id, season)): Path<(i64, i32)>,
) -> Result<Json<ApiResponse<SeasonRollup>>, ApiError> {
    let tv_id = validate_media_id(id)?;
    let season_number = validate_season_number(season)?;

    session.watch_state.load_tv_diary(tv_id).await?;
    let average_rating = session
        .watch_state
        .get_season_rollup(tv_id, season_number)
        .await;

    Ok(Json(ApiResponse::success(SeasonRollup {
        season_number,
        average_rating,
    })))
}

/// PUT /tv/{id}/seasons/{season}/rating
/// A rating of 0 clears the manual season rating.
pub async fn set_season_rating(
    Extension(session): Extension<Arc<UserSession>>,
    Path((id, season)): Path<(i64, i32)>,
    Json(request): Json<SeasonRatingRequest>,
) -> Result<Json<ApiResponse<SeasonRatingResponse>>, ApiError> {
    let tv_id = validate_media_id(id)?;
    let season_number = validate_season_number(season)?;

    let rating = session
        .watch_state
        .set_season_rating(tv_id, request.tv_name, season_number, request.rating)
        .await?;

    Ok(Json(ApiResponse::success(SeasonRatingResponse {
        tv_id,
        season_number,
        rating,
    })))
}

/// POST /tv/{id}/seasons/{season}/episodes/{episode}/watched
/// Toggles the watched mark of one episode.
pub async fn toggle_episode_watched(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
    Path((id, season, episode)): Path<(i64, i32, i32)>,
    request: Option<Json<EpisodeWatchedRequest>>,
) -> Result<Json<ApiResponse<EpisodeWatchedResponse>>, ApiError> {
    let key = EpisodeKey::new(
        validate_media_id(id)?,
        validate_season_number(season)?,
        validate_episode_number(episode)?,
    );
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let runtime = match request.runtime {
        Some(runtime) => Some(runtime),
        None => state.catalog().episode_runtime(&key).await.unwrap_or_else(|e| {
            warn!(episode = %key, error = %e, "Episode runtime lookup failed");
            None
        }),
    };

    let toggle = session
        .watch_state
        .mark_episode_watched(key, request.tv_name, runtime)
        .await?;

    Ok(Json(ApiResponse::success(EpisodeWatchedResponse {
        tv_id: key.tv_id,
        season_number: key.season_number,
        episode_number: key.episode_number,
        watched: toggle.is_watched(),
    })))
}

/// GET /tv/{id}/reviews/seasons
pub async fn get_season_reviews(
    Extension(session): Extension<Arc<UserSession>>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<SeasonReviewSummary>>>, ApiError> {
    let tv_id = validate_media_id(id)?;
    let summary = session.watch_state.season_review_summary(tv_id).await?;
    Ok(Json(ApiResponse::success(summary)))
}
