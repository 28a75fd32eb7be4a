use axum::{Extension, Json};
use std::sync::Arc;

use super::{ApiError, ApiResponse};
use crate::models::watch_state::WatchedTitle;
use crate::services::UserSession;

/// GET /collection/watched
/// Rated and logged titles, most recently watched first.
pub async fn list_watched(
    Extension(session): Extension<Arc<UserSession>>,
) -> Result<Json<ApiResponse<Vec<WatchedTitle>>>, ApiError> {
    let titles = session.watch_state.watched_titles().await?;
    Ok(Json(ApiResponse::success(titles)))
}
