use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{MediaId, MediaType};
use crate::models::lists::ListKind;

/// Merged per-title view of favorites, watchlist, ratings and diary rows.
///
/// The flags are independent: a title may be liked, watchlisted and rated at
/// the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnifiedWatchState {
    pub is_liked: bool,
    pub is_in_watchlist: bool,
    pub is_watched: bool,
    pub rating: Option<i32>,
}

impl UnifiedWatchState {
    #[must_use]
    pub const fn in_list(&self, kind: ListKind) -> bool {
        match kind {
            ListKind::Favorites => self.is_liked,
            ListKind::Watchlist => self.is_in_watchlist,
        }
    }

    pub const fn set_in_list(&mut self, kind: ListKind, present: bool) {
        match kind {
            ListKind::Favorites => self.is_liked = present,
            ListKind::Watchlist => self.is_in_watchlist = present,
        }
    }

    /// Keeps the higher of the current and the offered rating; zero counts
    /// as no rating.
    pub fn offer_rating(&mut self, rating: Option<i32>) {
        let Some(rating) = rating.filter(|r| *r > 0) else {
            return;
        };
        self.rating = Some(self.rating.map_or(rating, |current| current.max(rating)));
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.is_liked && !self.is_in_watchlist && !self.is_watched && self.rating.is_none()
    }
}

/// Raw per-title inputs the unified state is derived from.
///
/// Kept separately so a single mutation (a diary edit, a rating change) can
/// be applied without refetching every table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleSignals {
    pub liked: bool,
    pub watchlisted: bool,
    /// Title-level rating row; `Some(0)` is a cleared rating.
    pub stored_rating: Option<i32>,
    /// Diary rows by id with their rating.
    pub diary: HashMap<Uuid, Option<i32>>,
    pub rated_review: bool,
}

impl TitleSignals {
    #[must_use]
    pub fn state(&self) -> UnifiedWatchState {
        let has_rating = self.stored_rating.is_some_and(|r| r > 0);
        let mut state = UnifiedWatchState {
            is_liked: self.liked,
            is_in_watchlist: self.watchlisted,
            is_watched: has_rating || !self.diary.is_empty() || self.rated_review,
            rating: None,
        };
        state.offer_rating(self.stored_rating);
        for rating in self.diary.values() {
            state.offer_rating(*rating);
        }
        state
    }

    #[must_use]
    pub const fn in_list(&self, kind: ListKind) -> bool {
        match kind {
            ListKind::Favorites => self.liked,
            ListKind::Watchlist => self.watchlisted,
        }
    }

    pub const fn set_in_list(&mut self, kind: ListKind, present: bool) {
        match kind {
            ListKind::Favorites => self.liked = present,
            ListKind::Watchlist => self.watchlisted = present,
        }
    }
}

/// Lifecycle of one optimistic toggle.
///
/// `Idle -> Pending -> Confirmed | RolledBack`. A toggle aborted by a newer
/// toggle on the same key ends as `Superseded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleStatus {
    #[default]
    Idle,
    Pending,
    Confirmed,
    RolledBack,
    Superseded,
}

impl ToggleStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::RolledBack => "rolled_back",
            Self::Superseded => "superseded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub list: ListKind,
    pub media_id: MediaId,
    /// Presence this toggle asked for.
    pub requested: bool,
    pub status: ToggleStatus,
    /// Cached state after the toggle settled.
    pub state: UnifiedWatchState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeToggle {
    Marked,
    Unmarked,
}

impl EpisodeToggle {
    #[must_use]
    pub const fn is_watched(&self) -> bool {
        matches!(self, Self::Marked)
    }
}

/// Result of the best-effort fan-out delete. Nothing is rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub media_id: MediaId,
    pub media_type: MediaType,
    pub deleted: Vec<String>,
    pub failed: Vec<TableFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableFailure {
    pub table: String,
    pub error: String,
}

impl DeleteReport {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn failed_tables(&self) -> Vec<String> {
        self.failed.iter().map(|f| f.table.clone()).collect()
    }
}

/// Row of the "watched" collection: ratings and movie diary merged per title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchedTitle {
    pub media_id: MediaId,
    pub media_type: MediaType,
    pub title: String,
    pub poster: Option<String>,
    pub rating: Option<i32>,
    pub last_watched: Option<chrono::NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_rating_keeps_the_higher_value() {
        let mut state = UnifiedWatchState::default();
        state.offer_rating(Some(6));
        state.offer_rating(Some(9));
        state.offer_rating(Some(7));
        assert_eq!(state.rating, Some(9));
    }

    #[test]
    fn signals_take_the_best_rating_and_ignore_cleared_rows() {
        let mut signals = TitleSignals {
            stored_rating: Some(0),
            ..TitleSignals::default()
        };
        assert!(!signals.state().is_watched);

        signals.diary.insert(Uuid::new_v4(), Some(7));
        signals.diary.insert(Uuid::new_v4(), None);
        let state = signals.state();
        assert!(state.is_watched);
        assert_eq!(state.rating, Some(7));

        signals.stored_rating = Some(9);
        assert_eq!(signals.state().rating, Some(9));
    }

    #[test]
    fn offer_rating_ignores_zero() {
        let mut state = UnifiedWatchState::default();
        state.offer_rating(Some(0));
        state.offer_rating(None);
        assert_eq!(state.rating, None);
        assert!(state.is_empty());
    }

    #[test]
    fn list_flags_are_independent() {
        let mut state = UnifiedWatchState::default();
        state.set_in_list(ListKind::Favorites, true);
        state.set_in_list(ListKind::Watchlist, true);
        state.offer_rating(Some(8));
        assert!(state.in_list(ListKind::Favorites));
        assert!(state.in_list(ListKind::Watchlist));
        assert_eq!(state.rating, Some(8));

        state.set_in_list(ListKind::Favorites, false);
        assert!(!state.is_liked);
        assert!(state.is_in_watchlist);
    }
}
