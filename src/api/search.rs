use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{validate_page, validate_search_query};
use super::{ApiError, ApiResponse, AppState};
use crate::clients::tmdb::SearchResult;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_page")]
    pub page: u32,
}

const fn default_page() -> u32 {
    1
}

/// GET /search?q=&page=
pub async fn search_titles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<SearchResult>>>, ApiError> {
    let q = validate_search_query(&query.q)?;
    let page = validate_page(query.page)?;

    let results = state.catalog().search(q, page).await?;
    Ok(Json(ApiResponse::success(results)))
}
