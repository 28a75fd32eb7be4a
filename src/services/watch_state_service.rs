//! Domain service for a signed-in user's watch state.
//!
//! This module provides the [`WatchStateService`] trait: the per-user cache of
//! likes, watchlist, ratings and diary rows, and every mutation on them.

use thiserror::Error;
use uuid::Uuid;

use crate::domain::{EpisodeKey, MediaId, MediaType, UserId};
use crate::models::diary::{DiaryPatch, MovieDiaryEntry, MovieLog, TvDiaryEntry};
use crate::models::lists::TitleRef;
use crate::models::review::{ReviewDraft, ReviewRecord};
use crate::models::watch_state::{
    DeleteReport, EpisodeToggle, ToggleOutcome, UnifiedWatchState, WatchedTitle,
};
use crate::services::aggregation::SeasonReviewSummary;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum WatchStateError {
    /// Rejected before any remote call.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl WatchStateError {
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_permission_denied())
    }
}

#[async_trait::async_trait]
pub trait WatchStateService: Send + Sync {
    fn user_id(&self) -> UserId;

    /// Rebuilds the cache from favorites, watchlist, ratings, movie diary and
    /// reviews.
    async fn load(&self) -> Result<(), WatchStateError>;

    /// Drops the cache and aborts in-flight toggles.
    async fn clear(&self);

    async fn state(&self, media_id: MediaId) -> UnifiedWatchState;

    async fn is_liked(&self, media_id: MediaId) -> bool {
        self.state(media_id).await.is_liked
    }

    async fn is_in_watchlist(&self, media_id: MediaId) -> bool {
        self.state(media_id).await.is_in_watchlist
    }

    async fn get_rating(&self, media_id: MediaId) -> Option<i32> {
        self.state(media_id).await.rating
    }

    /// Adds the title to favorites if absent, removes it if present.
    async fn toggle_like(&self, title: TitleRef) -> Result<ToggleOutcome, WatchStateError>;

    /// Adds the title to the watchlist if absent, removes it if present.
    async fn toggle_watchlist(&self, title: TitleRef) -> Result<ToggleOutcome, WatchStateError>;

    /// Upserts the title-level rating. `0` is stored and reads as no rating.
    ///
    /// # Errors
    ///
    /// - [`WatchStateError::Validation`] if `rating` is outside `0..=10`
    async fn set_rating(
        &self,
        title: TitleRef,
        rating: i32,
    ) -> Result<UnifiedWatchState, WatchStateError>;

    /// Fetches every diary tier of one show and caches it for rollups.
    async fn load_tv_diary(&self, tv_id: MediaId) -> Result<Vec<TvDiaryEntry>, WatchStateError>;

    /// Rounded mean of the cached episode ratings of one season.
    async fn get_season_rollup(&self, tv_id: MediaId, season_number: i32) -> Option<i32>;

    /// Unmarks the episode if a row exists for it, marks it otherwise.
    async fn mark_episode_watched(
        &self,
        key: EpisodeKey,
        tv_name: Option<String>,
        runtime: Option<i32>,
    ) -> Result<EpisodeToggle, WatchStateError>;

    /// Sets the manual season rating. `0` deletes the season-tier rows.
    async fn set_season_rating(
        &self,
        tv_id: MediaId,
        tv_name: Option<String>,
        season_number: i32,
        rating: i32,
    ) -> Result<Option<i32>, WatchStateError>;

    async fn log_movie(&self, log: MovieLog) -> Result<MovieDiaryEntry, WatchStateError>;

    async fn update_movie_diary_entry(
        &self,
        id: Uuid,
        patch: DiaryPatch,
    ) -> Result<MovieDiaryEntry, WatchStateError>;

    async fn delete_movie_diary_entry(&self, id: Uuid) -> Result<(), WatchStateError>;

    /// # Errors
    ///
    /// - [`WatchStateError::Validation`] if the draft has neither text nor a
    ///   rating
    async fn write_review(&self, draft: ReviewDraft) -> Result<ReviewRecord, WatchStateError>;

    /// Ratings and movie diary merged into one row per title.
    async fn watched_titles(&self) -> Result<Vec<WatchedTitle>, WatchStateError>;

    /// Community episode ratings of a show grouped per season.
    async fn season_review_summary(
        &self,
        tv_id: MediaId,
    ) -> Result<Vec<SeasonReviewSummary>, WatchStateError>;

    /// Deletes the user's rows for one title across every per-title table.
    ///
    /// Tables are handled independently and nothing is rolled back; the
    /// report lists which tables failed.
    async fn delete_all_media_data(&self, media_id: MediaId, media_type: MediaType)
    -> DeleteReport;
}
