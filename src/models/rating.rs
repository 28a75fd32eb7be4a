use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{MediaId, MediaType, UserId};

/// Title-level rating row. One per `(user_id, movie_id)`.
///
/// The same shape is used for the legacy `ratings` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: UserId,
    pub movie_id: MediaId,
    pub movie_title: String,
    #[serde(default)]
    pub movie_poster: Option<String>,
    pub rating: i32,
    #[serde(default)]
    pub media_type: MediaType,
}

impl RatingRecord {
    /// A stored zero means the user cleared the rating through the upsert path.
    #[must_use]
    pub const fn effective_rating(&self) -> Option<i32> {
        if self.rating > 0 {
            Some(self.rating)
        } else {
            None
        }
    }
}
