use std::sync::Arc;
use uuid::Uuid;

use crate::constants::tables;
use crate::domain::{EpisodeKey, MediaId, SortOrder, UserId};
use crate::models::diary::{
    DiaryPatch, MovieDiaryEntry, NewMovieDiaryEntry, NewTvDiaryEntry, TvDiaryEntry,
};
use crate::store::{Query, RemoteStore, StoreError, decode_rows, encode_row};

pub struct DiaryRepository {
    remote: Arc<dyn RemoteStore>,
}

impl DiaryRepository {
    #[must_use]
    pub const fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    pub async fn movie_entries(&self, user_id: UserId) -> Result<Vec<MovieDiaryEntry>, StoreError> {
        let rows = self
            .remote
            .select(
                tables::MOVIE_DIARY,
                &Query::new()
                    .eq("user_id", user_id.to_string())
                    .order("watched_date", SortOrder::Descending),
            )
            .await?;
        decode_rows(tables::MOVIE_DIARY, rows)
    }

    pub async fn insert_movie(
        &self,
        entry: &NewMovieDiaryEntry,
    ) -> Result<MovieDiaryEntry, StoreError> {
        let row = encode_row(tables::MOVIE_DIARY, entry)?;
        let rows = self.remote.insert(tables::MOVIE_DIARY, vec![row]).await?;
        first(tables::MOVIE_DIARY, rows)
    }

    pub async fn update_movie(
        &self,
        user_id: UserId,
        id: Uuid,
        patch: &DiaryPatch,
    ) -> Result<Option<MovieDiaryEntry>, StoreError> {
        let rows = self
            .remote
            .update(
                tables::MOVIE_DIARY,
                &Query::new()
                    .eq("id", id.to_string())
                    .eq("user_id", user_id.to_string()),
                encode_row(tables::MOVIE_DIARY, patch)?,
            )
            .await?;
        Ok(decode_rows(tables::MOVIE_DIARY, rows)?.into_iter().next())
    }

    pub async fn delete_movie(&self, user_id: UserId, id: Uuid) -> Result<usize, StoreError> {
        self.remote
            .delete(
                tables::MOVIE_DIARY,
                &Query::new()
                    .eq("id", id.to_string())
                    .eq("user_id", user_id.to_string()),
            )
            .await
    }

    /// Every TV diary row of the user across all shows, newest first.
    pub async fn all_tv_entries(&self, user_id: UserId) -> Result<Vec<TvDiaryEntry>, StoreError> {
        let rows = self
            .remote
            .select(
                tables::TV_DIARY,
                &Query::new()
                    .eq("user_id", user_id.to_string())
                    .order("created_at", SortOrder::Descending),
            )
            .await?;
        decode_rows(tables::TV_DIARY, rows)
    }

    /// Every tier (series, season, episode) for one show, newest first.
    pub async fn tv_entries(
        &self,
        user_id: UserId,
        tv_id: MediaId,
    ) -> Result<Vec<TvDiaryEntry>, StoreError> {
        let rows = self
            .remote
            .select(
                tables::TV_DIARY,
                &Query::new()
                    .eq("user_id", user_id.to_string())
                    .eq("tv_id", tv_id.value())
                    .order("created_at", SortOrder::Descending),
            )
            .await?;
        decode_rows(tables::TV_DIARY, rows)
    }

    /// Rows for one exact episode key, newest first (rewatches included).
    pub async fn episode_entries(
        &self,
        user_id: UserId,
        key: &EpisodeKey,
    ) -> Result<Vec<TvDiaryEntry>, StoreError> {
        let rows = self
            .remote
            .select(
                tables::TV_DIARY,
                &Query::new()
                    .eq("user_id", user_id.to_string())
                    .eq("tv_id", key.tv_id.value())
                    .eq("season_number", key.season_number)
                    .eq("episode_number", key.episode_number)
                    .order("created_at", SortOrder::Descending),
            )
            .await?;
        decode_rows(tables::TV_DIARY, rows)
    }

    /// Season-tier rows (`episode_number` null) for one season, newest first.
    pub async fn season_entries(
        &self,
        user_id: UserId,
        tv_id: MediaId,
        season_number: i32,
    ) -> Result<Vec<TvDiaryEntry>, StoreError> {
        let rows = self
            .remote
            .select(
                tables::TV_DIARY,
                &season_tier(user_id, tv_id, season_number)
                    .order("created_at", SortOrder::Descending),
            )
            .await?;
        decode_rows(tables::TV_DIARY, rows)
    }

    pub async fn insert_tv(&self, entry: &NewTvDiaryEntry) -> Result<TvDiaryEntry, StoreError> {
        let row = encode_row(tables::TV_DIARY, entry)?;
        let rows = self.remote.insert(tables::TV_DIARY, vec![row]).await?;
        first(tables::TV_DIARY, rows)
    }

    pub async fn update_tv_rating(
        &self,
        user_id: UserId,
        id: Uuid,
        rating: i32,
    ) -> Result<Option<TvDiaryEntry>, StoreError> {
        let rows = self
            .remote
            .update(
                tables::TV_DIARY,
                &Query::new()
                    .eq("id", id.to_string())
                    .eq("user_id", user_id.to_string()),
                serde_json::json!({ "rating": rating }),
            )
            .await?;
        Ok(decode_rows(tables::TV_DIARY, rows)?.into_iter().next())
    }

    pub async fn delete_tv(&self, user_id: UserId, id: Uuid) -> Result<usize, StoreError> {
        self.remote
            .delete(
                tables::TV_DIARY,
                &Query::new()
                    .eq("id", id.to_string())
                    .eq("user_id", user_id.to_string()),
            )
            .await
    }

    pub async fn delete_season_tier(
        &self,
        user_id: UserId,
        tv_id: MediaId,
        season_number: i32,
    ) -> Result<usize, StoreError> {
        self.remote
            .delete(tables::TV_DIARY, &season_tier(user_id, tv_id, season_number))
            .await
    }
}

fn season_tier(user_id: UserId, tv_id: MediaId, season_number: i32) -> Query {
    Query::new()
        .eq("user_id", user_id.to_string())
        .eq("tv_id", tv_id.value())
        .eq("season_number", season_number)
        .is_null("episode_number")
}

fn first<T: serde::de::DeserializeOwned>(
    table: &str,
    rows: Vec<serde_json::Value>,
) -> Result<T, StoreError> {
    decode_rows(table, rows)?
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::Decode {
            table: table.to_string(),
            message: "insert returned no row".to_string(),
        })
}
