use super::ApiError;
use crate::domain::{MediaId, MediaType};

pub fn validate_media_id(id: i64) -> Result<MediaId, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid title ID: {id}. ID must be a positive integer"
        )));
    }
    Ok(MediaId::new(id))
}

pub fn parse_media_type(value: &str) -> Result<MediaType, ApiError> {
    value.parse().map_err(ApiError::validation)
}

pub fn validate_season_number(season: i32) -> Result<i32, ApiError> {
    if season < 0 {
        return Err(ApiError::validation(format!(
            "Invalid season number: {season}. Season must not be negative"
        )));
    }
    Ok(season)
}

pub fn validate_episode_number(episode: i32) -> Result<i32, ApiError> {
    if episode <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid episode number: {episode}. Episode must be a positive integer"
        )));
    }
    Ok(episode)
}

pub fn validate_search_query(query: &str) -> Result<&str, ApiError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("Search query cannot be empty"));
    }
    Ok(trimmed)
}

pub fn validate_page(page: u32) -> Result<u32, ApiError> {
    const MAX_PAGE: u32 = 500;

    if !(1..=MAX_PAGE).contains(&page) {
        return Err(ApiError::validation(format!(
            "Invalid page: {page}. Page must be between 1 and {MAX_PAGE}"
        )));
    }
    Ok(page)
}
