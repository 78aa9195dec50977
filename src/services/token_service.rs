//! Domain service for the refresh token lifecycle.
//!
//! Refresh tokens are opaque random strings stored server-side. Each one is
//! redeemable once: using it rotates it into a fresh token for the same user.

use thiserror::Error;

use crate::db::repositories::refresh_token::RefreshToken;

#[derive(Debug, Error)]
pub enum TokenError {
    /// The token is missing, expired, or was already rotated.
    #[error("Refresh token is invalid or expired")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for TokenError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for TokenError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait RefreshTokenService: Send + Sync {
    /// Persists a new token for `user_id`. The TTL depends on `remember_me`.
    async fn create_token(&self, user_id: i32, remember_me: bool)
    -> Result<RefreshToken, TokenError>;

    /// Exact match on the token string, ignoring expired rows. Empty strings
    /// are never found.
    async fn find_valid_token(&self, token: &str) -> Result<Option<RefreshToken>, TokenError>;

    /// Replaces `old` with a new token for the same user.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Unauthorized`] if `old` was already consumed.
    async fn rotate_token(&self, old: &RefreshToken) -> Result<RefreshToken, TokenError>;

    async fn delete_token(&self, token: &RefreshToken) -> Result<(), TokenError>;

    /// Revokes every session of the user. Returns the number of tokens removed.
    async fn delete_all_tokens_from_user(&self, user_id: i32) -> Result<u64, TokenError>;

    /// Deletes tokens that expired before now.
    async fn clear_expired(&self) -> Result<u64, TokenError>;
}
