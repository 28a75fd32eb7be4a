use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{limits, ratings};
use crate::domain::{MediaId, MediaType, UserId};

/// A user's written review. Independent of diary entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: UserId,
    pub movie_id: MediaId,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub review_text: Option<String>,
    #[serde(default)]
    pub is_spoiler: Option<bool>,
    #[serde(default)]
    pub season_number: Option<i32>,
    #[serde(default)]
    pub episode_number: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ReviewRecord {
    /// Episode-level rating contributed to community aggregates, if any.
    #[must_use]
    pub fn episode_rating(&self) -> Option<EpisodeRating> {
        Some(EpisodeRating {
            user_id: self.user_id,
            season_number: self.season_number?,
            episode_number: self.episode_number?,
            rating: self.rating?,
        })
    }
}

/// One community rating of one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRating {
    pub user_id: UserId,
    pub season_number: i32,
    pub episode_number: i32,
    pub rating: i32,
}

/// Review as submitted by the signed-in user, before it gets an owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReviewDraft {
    pub media_id: MediaId,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub review_text: Option<String>,
    #[serde(default)]
    pub is_spoiler: bool,
    #[serde(default)]
    pub season_number: Option<i32>,
    #[serde(default)]
    pub episode_number: Option<i32>,
}

impl ReviewDraft {
    /// Rejects drafts the remote store would accept but the product does not.
    pub fn validate(&self) -> Result<(), String> {
        let text = self.review_text.as_deref().map(str::trim).unwrap_or("");

        if text.is_empty() && self.rating.is_none() {
            return Err("A review needs text or a rating".to_string());
        }

        if text.len() > limits::MAX_REVIEW_LENGTH {
            return Err(format!(
                "Review text must be {} characters or less",
                limits::MAX_REVIEW_LENGTH
            ));
        }

        if let Some(rating) = self.rating
            && !(ratings::MIN + 1..=ratings::MAX).contains(&rating)
        {
            return Err(format!(
                "Review rating must be between {} and {}",
                ratings::MIN + 1,
                ratings::MAX
            ));
        }

        if self.episode_number.is_some() && self.season_number.is_none() {
            return Err("An episode review needs a season number".to_string());
        }

        Ok(())
    }

    #[must_use]
    pub fn into_record(self, user_id: UserId) -> ReviewRecord {
        let review_text = self
            .review_text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        ReviewRecord {
            id: None,
            user_id,
            movie_id: self.media_id,
            media_type: self.media_type,
            rating: self.rating,
            review_text,
            is_spoiler: Some(self.is_spoiler),
            season_number: self.season_number,
            episode_number: self.episode_number,
            created_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_without_text_or_rating_is_rejected() {
        let draft = ReviewDraft {
            media_id: MediaId::new(603),
            review_text: Some("   ".to_string()),
            ..ReviewDraft::default()
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn draft_with_rating_only_is_accepted() {
        let draft = ReviewDraft {
            media_id: MediaId::new(603),
            rating: Some(7),
            ..ReviewDraft::default()
        };
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn draft_rating_out_of_range_is_rejected() {
        let draft = ReviewDraft {
            media_id: MediaId::new(603),
            rating: Some(11),
            ..ReviewDraft::default()
        };
        assert!(draft.validate().is_err());
    }

    #[test]
    fn episode_rating_requires_all_coordinates() {
        let user_id: UserId = "6f1c1f0e-8d3b-4c41-9d8e-1c2b3a4d5e6f".parse().unwrap();
        let mut record = ReviewDraft {
            media_id: MediaId::new(1399),
            media_type: MediaType::Tv,
            rating: Some(9),
            season_number: Some(1),
            ..ReviewDraft::default()
        }
        .into_record(user_id);
        assert!(record.episode_rating().is_none());

        record.episode_number = Some(3);
        let rating = record.episode_rating().unwrap();
        assert_eq!((rating.season_number, rating.episode_number), (1, 3));
        assert_eq!(rating.rating, 9);
    }
}
