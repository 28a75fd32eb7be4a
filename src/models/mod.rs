pub mod diary;
pub mod lists;
pub mod profile;
pub mod rating;
pub mod review;
pub mod watch_state;
