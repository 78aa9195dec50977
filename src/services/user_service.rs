//! Domain service for user accounts.

use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::domain::{FieldErrors, UserRole};
use crate::services::auth_service::AuthError;

pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),

    /// Bad pagination parameters.
    #[error("Invalid query: {0}")]
    InvalidQuery(FieldErrors),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<AuthError> for UserError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(errors) => Self::Validation(errors),
            AuthError::UserNotFound => Self::NotFound("user".to_string()),
            AuthError::Database(msg) => Self::Database(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<User>,
    pub meta: PageMeta,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Users ordered by id. `limit` is capped at [`MAX_PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns [`UserError::InvalidQuery`] when `page` or `limit` is zero.
    async fn list_users(&self, page: u64, limit: u64) -> Result<UserPage, UserError>;

    async fn get_user(&self, id: i32) -> Result<User, UserError>;

    /// Registration without issuing tokens.
    async fn create_user(&self, email: &str, password: &str) -> Result<User, UserError>;

    /// Returns [`UserError::NotFound`] when no user has this email.
    async fn set_role(&self, email: &str, role: UserRole) -> Result<(), UserError>;
}
