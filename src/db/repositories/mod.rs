pub mod profile;
pub mod refresh_token;
pub mod user;
