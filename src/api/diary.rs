//! Movie diary and review writes.

use axum::{
    Extension, Json,
    extract::Path,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{ApiError, ApiResponse};
use crate::models::diary::{DiaryPatch, MovieDiaryEntry, MovieLog};
use crate::models::review::{ReviewDraft, ReviewRecord};
use crate::services::UserSession;

/// POST /diary/movies
pub async fn log_movie(
    Extension(session): Extension<Arc<UserSession>>,
    Json(log): Json<MovieLog>,
) -> Result<Json<ApiResponse<MovieDiaryEntry>>, ApiError> {
    let entry = session.watch_state.log_movie(log).await?;
    Ok(Json(ApiResponse::success(entry)))
}

/// PATCH /diary/movies/{entry_id}
pub async fn update_movie_entry(
    Extension(session): Extension<Arc<UserSession>>,
    Path(entry_id): Path<Uuid>,
    Json(patch): Json<DiaryPatch>,
) -> Result<Json<ApiResponse<MovieDiaryEntry>>, ApiError> {
    let entry = session
        .watch_state
        .update_movie_diary_entry(entry_id, patch)
        .await?;
    Ok(Json(ApiResponse::success(entry)))
}

/// DELETE /diary/movies/{entry_id}
pub async fn delete_movie_entry(
    Extension(session): Extension<Arc<UserSession>>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>, ApiError> {
    session.watch_state.delete_movie_diary_entry(entry_id).await?;
    Ok(Json(ApiResponse::success(entry_id)))
}

/// POST /reviews
pub async fn write_review(
    Extension(session): Extension<Arc<UserSession>>,
    Json(draft): Json<ReviewDraft>,
) -> Result<Json<ApiResponse<ReviewRecord>>, ApiError> {
    let review = session.watch_state.write_review(draft).await?;
    Ok(Json(ApiResponse::success(review)))
}
