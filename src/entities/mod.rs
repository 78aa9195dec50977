pub mod refresh_tokens;
pub mod user_profiles;
pub mod users;
