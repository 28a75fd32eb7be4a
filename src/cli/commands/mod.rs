mod account;
mod catalog;
mod context;
mod diary;
mod serve;
mod titles;
mod tv;

pub use account::{cmd_init, cmd_login, cmd_logout, cmd_whoami};
pub use catalog::{cmd_discover, cmd_person, cmd_search, cmd_show};
pub use diary::{cmd_diary_edit, cmd_diary_remove, cmd_log, cmd_review, cmd_watched};
pub use serve::cmd_serve;
pub use titles::{cmd_forget, cmd_like, cmd_rate, cmd_state, cmd_watchlist};
pub use tv::{cmd_episode, cmd_reviews, cmd_season};
