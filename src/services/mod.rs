pub mod aggregation;
pub use aggregation::{EpisodeReviewSummary, SeasonReviewSummary, SeasonRollup};

pub mod catalog;
pub use catalog::{CatalogError, CatalogService, SeasonView, TitleView};

pub mod image;
pub use image::{ImageService, ImageSize};

pub mod session;
pub use session::{
    Backend, MemoryBackend, SessionError, SessionFile, SessionRegistry, SupabaseBackend,
    UserSession,
};

pub mod watch_state_service;
pub mod watch_state_impl;
pub use watch_state_impl::{RemoteWatchStateService, WatchStateCache};
pub use watch_state_service::{WatchStateError, WatchStateService};
