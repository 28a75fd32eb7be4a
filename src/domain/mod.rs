//! Domain types for watch-state tracking with strong typing.
//!
//! Newtypes keep catalog IDs, user IDs and episode coordinates from being
//! mixed up when they flow between the remote store and the catalog client.

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Catalog identifier of a movie or TV show (the TMDB numeric ID).
///
/// Remote rows store this in the `movie_id` column for both movies and shows.
///
/// # Examples
///
/// ```rust
/// use sceneburn::domain::MediaId;
///
/// let id = MediaId::new(603);
/// assert_eq!(id.value(), 603);
/// assert_eq!(id.to_string(), "603");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MediaId(i64);

impl MediaId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        debug_assert!(id >= 0, "MediaId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<MediaId> for i64 {
    fn from(id: MediaId) -> Self {
        id.0
    }
}

impl From<i64> for MediaId {
    fn from(id: i64) -> Self {
        Self::new(id)
    }
}

impl Serialize for MediaId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for MediaId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i64::deserialize(deserializer)?;
        Ok(Self::new(id))
    }
}

/// Identity of a signed-in user as issued by the auth backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Kind of catalog title. Stored as `"movie"` / `"tv"` in remote rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Movie,
    Tv,
}

impl MediaType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }

    /// Diary table holding watch logs for this kind of title.
    #[must_use]
    pub const fn diary_table(&self) -> &'static str {
        match self {
            Self::Movie => crate::constants::tables::MOVIE_DIARY,
            Self::Tv => crate::constants::tables::TV_DIARY,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movie" | "movies" | "film" => Ok(Self::Movie),
            "tv" | "show" | "series" => Ok(Self::Tv),
            other => Err(format!("unknown media type: {other}")),
        }
    }
}

/// Sort order enumeration to replace boolean blindness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    #[must_use]
    pub const fn is_ascending(&self) -> bool {
        matches!(self, Self::Ascending)
    }
}

/// Exact coordinates of one episode of a show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeKey {
    pub tv_id: MediaId,
    pub season_number: i32,
    pub episode_number: i32,
}

impl EpisodeKey {
    #[must_use]
    pub const fn new(tv_id: MediaId, season_number: i32, episode_number: i32) -> Self {
        Self {
            tv_id,
            season_number,
            episode_number,
        }
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} S{:02}E{:02}",
            self.tv_id, self.season_number, self.episode_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_id_conversions() {
        let id = MediaId::new(603);
        assert_eq!(id.value(), 603);
        assert_eq!(id.to_string(), "603");
        assert_eq!(i64::from(id), 603);
        assert_eq!(MediaId::from(603), id);
    }

    #[test]
    fn media_id_serialization() {
        let id = MediaId::new(603);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "603");
        let deserialized: MediaId = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, id);
    }

    #[test]
    fn media_type_parsing() {
        assert_eq!("movie".parse::<MediaType>().unwrap(), MediaType::Movie);
        assert_eq!("TV".parse::<MediaType>().unwrap(), MediaType::Tv);
        assert!("podcast".parse::<MediaType>().is_err());
        assert_eq!(serde_json::to_string(&MediaType::Tv).unwrap(), "\"tv\"");
    }

    #[test]
    fn media_type_diary_table() {
        assert_eq!(MediaType::Movie.diary_table(), "movie_diary");
        assert_eq!(MediaType::Tv.diary_table(), "tv_diary");
    }

    #[test]
    fn user_id_round_trips_through_string() {
        let raw = "6f1c1f0e-8d3b-4c41-9d8e-1c2b3a4d5e6f";
        let id: UserId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{raw}\""));
    }

    #[test]
    fn episode_key_display() {
        let key = EpisodeKey::new(MediaId::new(1399), 1, 9);
        assert_eq!(key.to_string(), "1399 S01E09");
    }

    #[test]
    fn sort_order_boolean_blindness_fix() {
        assert!(SortOrder::Ascending.is_ascending());
        assert!(!SortOrder::Descending.is_ascending());
    }
}
