use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::constants::tables;
use crate::domain::{MediaId, MediaType, UserId};

/// Presence-only user lists. A row existing means the title is in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    /// "Liked" titles.
    Favorites,
    /// Titles the user intends to watch.
    Watchlist,
}

impl ListKind {
    #[must_use]
    pub const fn table(&self) -> &'static str {
        match self {
            Self::Favorites => tables::FAVORITES,
            Self::Watchlist => tables::WATCHLIST,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::Watchlist => "watchlist",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: UserId,
    pub movie_id: MediaId,
    pub movie_title: String,
    #[serde(default)]
    pub movie_poster: Option<String>,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

pub type WatchlistItem = ListItem;

pub type FavoriteItem = ListItem;

/// Catalog facts captured alongside a list or rating row so that collection
/// pages render without a catalog round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TitleRef {
    pub media_id: MediaId,
    pub title: String,
    pub poster: Option<String>,
    pub media_type: MediaType,
}

impl TitleRef {
    #[must_use]
    pub fn new(
        media_id: MediaId,
        title: impl Into<String>,
        poster: Option<String>,
        media_type: MediaType,
    ) -> Self {
        Self {
            media_id,
            title: title.into(),
            poster,
            media_type,
        }
    }

    #[must_use]
    pub fn list_item(&self, user_id: UserId) -> ListItem {
        ListItem {
            id: None,
            user_id,
            movie_id: self.media_id,
            movie_title: self.title.clone(),
            movie_poster: self.poster.clone(),
            media_type: self.media_type,
            added_at: Some(Utc::now()),
        }
    }
}
