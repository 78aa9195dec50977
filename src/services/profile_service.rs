//! Domain service for user profiles.
//!
//! Profiles are one-to-one with users and are created lazily the first time
//! a user's profile is requested.

use thiserror::Error;

use crate::db::repositories::profile::Profile;
use crate::domain::{FieldErrors, UserRole};

pub const DEFAULT_SEARCH_LIMIT: u64 = 5;
pub const MAX_SEARCH_LIMIT: u64 = 50;

/// Errors specific to profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Not allowed to modify this profile")]
    Forbidden,

    #[error("Invalid query: {0}")]
    InvalidQuery(FieldErrors),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for ProfileError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for ProfileError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Editable profile fields as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

/// The authenticated user performing an operation.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: i32,
    pub role: UserRole,
}

#[async_trait::async_trait]
pub trait ProfileService: Send + Sync {
    async fn get_profile(&self, id: i32) -> Result<Profile, ProfileError>;

    /// Returns the user's profile, creating a default one if it does not
    /// exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotFound`] if the user does not exist.
    async fn get_user_profile(&self, user_id: i32) -> Result<Profile, ProfileError>;

    /// Substring search on usernames. `limit` defaults to
    /// [`DEFAULT_SEARCH_LIMIT`] and is capped at [`MAX_SEARCH_LIMIT`].
    async fn find_profiles_by_username(
        &self,
        username: &str,
        limit: Option<u64>,
    ) -> Result<Vec<Profile>, ProfileError>;

    /// Creates or replaces the caller's own profile.
    async fn create_or_update_profile(
        &self,
        user_id: i32,
        input: ProfileInput,
    ) -> Result<Profile, ProfileError>;

    /// Updates a profile by id. The actor must own it or be a moderator.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Forbidden`] when the actor may not edit it.
    async fn update_profile(
        &self,
        actor: Actor,
        profile_id: i32,
        input: ProfileInput,
    ) -> Result<Profile, ProfileError>;

    async fn update_profile_picture(
        &self,
        user_id: i32,
        path: String,
    ) -> Result<Profile, ProfileError>;

    /// Resets the picture to the default image.
    async fn delete_profile_picture(&self, user_id: i32) -> Result<Profile, ProfileError>;
}
