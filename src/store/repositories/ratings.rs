use serde_json::Value;
use std::sync::Arc;

use crate::constants::{ratings, tables};
use crate::domain::UserId;
use crate::models::rating::RatingRecord;
use crate::store::{Query, RemoteStore, StoreError, decode_rows, encode_row};

pub struct RatingRepository {
    remote: Arc<dyn RemoteStore>,
}

impl RatingRepository {
    #[must_use]
    pub const fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<RatingRecord>, StoreError> {
        let rows = self
            .remote
            .select(
                tables::USER_RATINGS,
                &Query::new().eq("user_id", user_id.to_string()),
            )
            .await?;
        decode_rows(tables::USER_RATINGS, rows)
    }

    /// Insert-or-replace keyed on `(user_id, movie_id)`.
    pub async fn upsert(&self, record: &RatingRecord) -> Result<RatingRecord, StoreError> {
        let row: Value = encode_row(tables::USER_RATINGS, record)?;
        let rows = self
            .remote
            .upsert(tables::USER_RATINGS, vec![row], ratings::CONFLICT_TARGET)
            .await?;
        Ok(decode_rows(tables::USER_RATINGS, rows)?
            .into_iter()
            .next()
            .unwrap_or_else(|| record.clone()))
    }
}
