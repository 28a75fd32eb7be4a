pub mod diary;
pub mod lists;
pub mod profiles;
pub mod ratings;
pub mod reviews;
