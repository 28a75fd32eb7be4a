//! Per-title endpoints: catalog page, watch state, likes, watchlist, rating
//! and the fan-out delete.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::validation::{parse_media_type, validate_media_id};
use super::{ApiError, ApiResponse, AppState, RatingRequest, TitleInput};
use crate::domain::{MediaId, MediaType};
use crate::models::lists::TitleRef;
use crate::models::watch_state::{DeleteReport, ToggleOutcome, UnifiedWatchState};
use crate::services::{TitleView, UserSession};

fn parse_title_path((media_type, id): (String, i64)) -> Result<(MediaType, MediaId), ApiError> {
    Ok((parse_media_type(&media_type)?, validate_media_id(id)?))
}

/// Uses the client's title and poster when sent, the catalog otherwise.
async fn resolve_title_ref(
    state: &AppState,
    media_type: MediaType,
    id: MediaId,
    input: TitleInput,
) -> Result<TitleRef, ApiError> {
    match input.title.filter(|t| !t.trim().is_empty()) {
        Some(title) => Ok(TitleRef::new(id, title, input.poster, media_type)),
        None => Ok(state.catalog().title_ref(media_type, id).await?),
    }
}

/// GET /titles/{media_type}/{id}
pub async fn get_title(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
    Path(path): Path<(String, i64)>,
) -> Result<Json<ApiResponse<TitleView>>, ApiError> {
    let (media_type, id) = parse_title_path(path)?;
    let view = state
        .catalog()
        .title_view(media_type, id, session.watch_state.as_ref())
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

/// GET /titles/{media_type}/{id}/state
pub async fn get_state(
    Extension(session): Extension<Arc<UserSession>>,
    Path(path): Path<(String, i64)>,
) -> Result<Json<ApiResponse<UnifiedWatchState>>, ApiError> {
    let (_, id) = parse_title_path(path)?;
    Ok(Json(ApiResponse::success(
        session.watch_state.state(id).await,
    )))
}

/// POST /titles/{media_type}/{id}/like
pub async fn toggle_like(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
    Path(path): Path<(String, i64)>,
    input: Option<Json<TitleInput>>,
) -> Result<Json<ApiResponse<ToggleOutcome>>, ApiError> {
    let (media_type, id) = parse_title_path(path)?;
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let title = resolve_title_ref(&state, media_type, id, input).await?;

    let outcome = session.watch_state.toggle_like(title).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// POST /titles/{media_type}/{id}/watchlist
pub async fn toggle_watchlist(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
    Path(path): Path<(String, i64)>,
    input: Option<Json<TitleInput>>,
) -> Result<Json<ApiResponse<ToggleOutcome>>, ApiError> {
    let (media_type, id) = parse_title_path(path)?;
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let title = resolve_title_ref(&state, media_type, id, input).await?;

    let outcome = session.watch_state.toggle_watchlist(title).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// PUT /titles/{media_type}/{id}/rating
pub async fn set_rating(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Arc<UserSession>>,
    Path(path): Path<(String, i64)>,
    Json(request): Json<RatingRequest>,
) -> Result<Json<ApiResponse<UnifiedWatchState>>, ApiError> {
    let (media_type, id) = parse_title_path(path)?;
    let title = resolve_title_ref(&state, media_type, id, request.title).await?;

    let updated = session.watch_state.set_rating(title, request.rating).await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// DELETE /titles/{media_type}/{id}
///
/// Best effort: the report lists the tables that could not be cleared.
pub async fn delete_title_data(
    Extension(session): Extension<Arc<UserSession>>,
    Path(path): Path<(String, i64)>,
) -> Result<Json<ApiResponse<DeleteReport>>, ApiError> {
    let (media_type, id) = parse_title_path(path)?;
    let report = session
        .watch_state
        .delete_all_media_data(id, media_type)
        .await;
    Ok(Json(ApiResponse::success(report)))
}
