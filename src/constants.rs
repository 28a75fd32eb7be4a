pub mod tables {

    pub const USER_RATINGS: &str = "user_ratings";

    /// Pre-`user_ratings` table still written by older clients.
    pub const LEGACY_RATINGS: &str = "ratings";

    pub const USER_REVIEWS: &str = "user_reviews";

    pub const WATCHLIST: &str = "watchlist";

    pub const ENHANCED_WATCHLIST_ITEMS: &str = "enhanced_watchlist_items";

    pub const FAVORITES: &str = "favorites";

    pub const ACTIVITY_FEED: &str = "activity_feed";

    pub const MOVIE_DIARY: &str = "movie_diary";

    pub const TV_DIARY: &str = "tv_diary";

    pub const PROFILES: &str = "profiles";
}

pub mod ratings {

    pub const MIN: i32 = 0;

    pub const MAX: i32 = 10;

    /// Conflict target for title-level rating upserts.
    pub const CONFLICT_TARGET: &[&str] = &["user_id", "movie_id"];
}

pub mod diary {

    /// Runtime recorded for an episode when the catalog does not know it.
    pub const DEFAULT_EPISODE_RUNTIME_MINUTES: i32 = 45;
}

pub mod limits {

    pub const MAX_SEARCH_RESULTS: usize = 20;

    pub const MAX_REVIEW_LENGTH: usize = 10_000;
}
