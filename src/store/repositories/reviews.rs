use std::sync::Arc;

use crate::constants::tables;
use crate::domain::{MediaId, MediaType, UserId};
use crate::models::review::{EpisodeRating, ReviewRecord};
use crate::store::{Query, RemoteStore, StoreError, decode_rows, encode_row};

pub struct ReviewRepository {
    remote: Arc<dyn RemoteStore>,
}

impl ReviewRepository {
    #[must_use]
    pub const fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ReviewRecord>, StoreError> {
        let rows = self
            .remote
            .select(
                tables::USER_REVIEWS,
                &Query::new().eq("user_id", user_id.to_string()),
            )
            .await?;
        decode_rows(tables::USER_REVIEWS, rows)
    }

    pub async fn insert(&self, review: &ReviewRecord) -> Result<ReviewRecord, StoreError> {
        let row = encode_row(tables::USER_REVIEWS, review)?;
        let rows = self.remote.insert(tables::USER_REVIEWS, vec![row]).await?;
        Ok(decode_rows(tables::USER_REVIEWS, rows)?
            .into_iter()
            .next()
            .unwrap_or_else(|| review.clone()))
    }

    /// Episode-level ratings of a show from every user. Not filtered by the
    /// caller's identity; reviews are publicly readable.
    pub async fn community_episode_ratings(
        &self,
        tv_id: MediaId,
    ) -> Result<Vec<EpisodeRating>, StoreError> {
        let rows = self
            .remote
            .select(
                tables::USER_REVIEWS,
                &Query::new()
                    .eq("movie_id", tv_id.value())
                    .eq("media_type", MediaType::Tv.as_str())
                    .not_null("season_number")
                    .not_null("episode_number")
                    .not_null("rating"),
            )
            .await?;
        let reviews: Vec<ReviewRecord> = decode_rows(tables::USER_REVIEWS, rows)?;
        Ok(reviews.iter().filter_map(ReviewRecord::episode_rating).collect())
    }
}
