pub mod supabase_auth;
pub mod tmdb;
