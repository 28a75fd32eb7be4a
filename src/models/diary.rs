use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{EpisodeKey, MediaId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieDiaryEntry {
    pub id: Uuid,
    pub user_id: UserId,
    pub movie_id: MediaId,
    pub movie_title: String,
    #[serde(default)]
    pub movie_poster: Option<String>,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
    pub watched_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMovieDiaryEntry {
    pub user_id: UserId,
    pub movie_id: MediaId,
    pub movie_title: String,
    pub movie_poster: Option<String>,
    pub rating: Option<i32>,
    pub notes: Option<String>,
    pub watched_date: NaiveDate,
}

/// A watch log as submitted by a user; the owner comes from the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MovieLog {
    pub movie_id: MediaId,
    pub movie_title: String,
    #[serde(default)]
    pub movie_poster: Option<String>,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Defaults to today.
    #[serde(default)]
    pub watched_date: Option<NaiveDate>,
}

impl MovieLog {
    #[must_use]
    pub fn into_entry(self, user_id: UserId, today: NaiveDate) -> NewMovieDiaryEntry {
        NewMovieDiaryEntry {
            user_id,
            movie_id: self.movie_id,
            movie_title: self.movie_title,
            movie_poster: self.movie_poster,
            rating: self.rating,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            watched_date: self.watched_date.unwrap_or(today),
        }
    }
}

/// Partial update for an existing diary row. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched_date: Option<NaiveDate>,
}

impl DiaryPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rating.is_none() && self.notes.is_none() && self.watched_date.is_none()
    }
}

/// Granularity of a TV diary row, derived from which coordinates are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiaryTier {
    Series,
    Season(i32),
    Episode { season: i32, episode: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TvDiaryEntry {
    pub id: Uuid,
    pub user_id: UserId,
    pub tv_id: MediaId,
    #[serde(default)]
    pub tv_name: Option<String>,
    #[serde(default)]
    pub season_number: Option<i32>,
    #[serde(default)]
    pub episode_number: Option<i32>,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub runtime: Option<i32>,
    pub watched_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl TvDiaryEntry {
    /// An episode number without a season is malformed; it is read as a
    /// series-level row.
    #[must_use]
    pub const fn tier(&self) -> DiaryTier {
        match (self.season_number, self.episode_number) {
            (Some(season), Some(episode)) => DiaryTier::Episode { season, episode },
            (Some(season), None) => DiaryTier::Season(season),
            (None, _) => DiaryTier::Series,
        }
    }

    #[must_use]
    pub fn is_episode(&self, key: &EpisodeKey) -> bool {
        self.tv_id == key.tv_id
            && self.tier()
                == DiaryTier::Episode {
                    season: key.season_number,
                    episode: key.episode_number,
                }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTvDiaryEntry {
    pub user_id: UserId,
    pub tv_id: MediaId,
    pub tv_name: Option<String>,
    pub season_number: Option<i32>,
    pub episode_number: Option<i32>,
    pub rating: Option<i32>,
    pub notes: Option<String>,
    pub runtime: Option<i32>,
    pub watched_date: NaiveDate,
}

/// Picks the "current" row among duplicates (rewatches): latest `created_at`.
#[must_use]
pub fn most_recent<'a, T, I>(entries: I, created_at: impl Fn(&T) -> DateTime<Utc>) -> Option<&'a T>
where
    I: IntoIterator<Item = &'a T>,
    T: 'a,
{
    entries.into_iter().max_by_key(|e| created_at(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(season: Option<i32>, episode: Option<i32>, minute: u32) -> TvDiaryEntry {
        TvDiaryEntry {
            id: Uuid::new_v4(),
            user_id: "6f1c1f0e-8d3b-4c41-9d8e-1c2b3a4d5e6f".parse().unwrap(),
            tv_id: MediaId::new(1399),
            tv_name: None,
            season_number: season,
            episode_number: episode,
            rating: None,
            notes: None,
            runtime: None,
            watched_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
        }
    }

    #[test]
    fn tier_follows_null_coordinates() {
        assert_eq!(entry(None, None, 0).tier(), DiaryTier::Series);
        assert_eq!(entry(Some(2), None, 0).tier(), DiaryTier::Season(2));
        assert_eq!(
            entry(Some(2), Some(5), 0).tier(),
            DiaryTier::Episode {
                season: 2,
                episode: 5
            }
        );
        assert_eq!(entry(None, Some(5), 0).tier(), DiaryTier::Series);
    }

    #[test]
    fn most_recent_prefers_latest_created_at() {
        let rows = vec![entry(Some(1), Some(1), 5), entry(Some(1), Some(1), 30)];
        let latest = most_recent(&rows, |e| e.created_at).unwrap();
        assert_eq!(latest.created_at.format("%M").to_string(), "30");
    }

    #[test]
    fn diary_patch_skips_absent_fields() {
        let patch = DiaryPatch {
            notes: Some("rewatch".to_string()),
            ..DiaryPatch::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "notes": "rewatch" }));
        assert!(DiaryPatch::default().is_empty());
    }
}
