use serde::{Deserialize, Serialize};

use crate::domain::MediaId;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Catalog facts a client already has on screen. When `title` is missing the
/// handler looks it up.
#[derive(Debug, Default, Deserialize)]
pub struct TitleInput {
    pub title: Option<String>,
    pub poster: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i32,
    #[serde(flatten)]
    pub title: TitleInput,
}

#[derive(Debug, Deserialize)]
pub struct SeasonRatingRequest {
    pub rating: i32,
    pub tv_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SeasonRatingResponse {
    pub tv_id: MediaId,
    pub season_number: i32,
    pub rating: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EpisodeWatchedRequest {
    pub tv_name: Option<String>,
    pub runtime: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct EpisodeWatchedResponse {
    pub tv_id: MediaId,
    pub season_number: i32,
    pub episode_number: i32,
    pub watched: bool,
}

#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub signed_out: bool,
}
