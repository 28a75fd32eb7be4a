//! Domain events for watch-state changes.
//!
//! Events are published on the event bus after a mutation is confirmed by the
//! remote store, and streamed to the owning user's clients via SSE.

use serde::Serialize;

use crate::domain::{MediaId, UserId};
use crate::models::watch_state::UnifiedWatchState;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum WatchStateEvent {
    StateChanged {
        user_id: UserId,
        media_id: MediaId,
        state: UnifiedWatchState,
    },
    EpisodeToggled {
        user_id: UserId,
        tv_id: MediaId,
        season_number: i32,
        episode_number: i32,
        watched: bool,
    },
    SeasonRatingChanged {
        user_id: UserId,
        tv_id: MediaId,
        season_number: i32,
        rating: Option<i32>,
    },
    MediaDataDeleted {
        user_id: UserId,
        media_id: MediaId,
        failed_tables: Vec<String>,
    },
}

impl WatchStateEvent {
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::StateChanged { user_id, .. }
            | Self::EpisodeToggled { user_id, .. }
            | Self::SeasonRatingChanged { user_id, .. }
            | Self::MediaDataDeleted { user_id, .. } => *user_id,
        }
    }
}
