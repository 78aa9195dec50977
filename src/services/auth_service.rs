//! Domain service for authentication.
//!
//! Handles registration, login, refresh token redemption, session
//! termination and password changes.

use thiserror::Error;

use crate::db::User;
use crate::db::repositories::refresh_token::RefreshToken;
use crate::domain::FieldErrors;
use crate::services::jwt::AccessToken;
use crate::services::token_service::TokenError;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, expired or already rotated refresh token.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Unauthorized => Self::Unauthorized,
            TokenError::Database(msg) => Self::Database(msg),
            TokenError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Internal(format!("Failed to sign access token: {err}"))
    }
}

/// Everything a successful login hands back to the client.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account and logs it in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for a malformed email, a weak
    /// password, or an email that is already registered.
    async fn register(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<AuthSession, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<AuthSession, AuthError>;

    /// Redeems a refresh token for a new access token and a rotated refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;

    /// Revokes the session behind `refresh_token`.
    async fn terminate_current(&self, refresh_token: &str) -> Result<(), AuthError>;

    /// Revokes every session of the user owning `refresh_token`.
    async fn terminate_all(&self, refresh_token: &str) -> Result<u64, AuthError>;

    /// Verifies `current_password`, stores the new hash, and revokes every
    /// refresh token of the user.
    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}
