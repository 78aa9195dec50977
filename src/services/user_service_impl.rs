//! `SeaORM` implementation of the `UserService` trait.

use async_trait::async_trait;

use crate::config::SecurityConfig;
use crate::db::{Store, User};
use crate::domain::{FieldErrors, UserRole};
use crate::services::auth_service_impl::create_account;
use crate::services::user_service::{MAX_PAGE_SIZE, PageMeta, UserError, UserPage, UserService};

pub struct SeaOrmUserService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn list_users(&self, page: u64, limit: u64) -> Result<UserPage, UserError> {
        let mut errors = FieldErrors::new();
        if page < 1 {
            errors.add("page", "Page must be at least 1");
        }
        if limit < 1 {
            errors.add("limit", "Limit must be at least 1");
        }
        errors.into_result().map_err(UserError::InvalidQuery)?;

        let limit = limit.min(MAX_PAGE_SIZE);
        // SQLite binds offsets as i64
        let offset = (page - 1)
            .checked_mul(limit)
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| {
                UserError::InvalidQuery(FieldErrors::single("page", "Page is out of range"))
            })?;
        let (users, total) = self.store.user_repo().list(offset, limit).await?;

        Ok(UserPage {
            users,
            meta: PageMeta {
                total,
                page,
                limit,
                pages: total.div_ceil(limit),
            },
        })
    }

    async fn get_user(&self, id: i32) -> Result<User, UserError> {
        if id < 1 {
            return Err(UserError::NotFound(id.to_string()));
        }

        self.store
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| UserError::NotFound(id.to_string()))
    }

    async fn create_user(&self, email: &str, password: &str) -> Result<User, UserError> {
        Ok(create_account(&self.store, &self.security, email, password).await?)
    }

    async fn set_role(&self, email: &str, role: UserRole) -> Result<(), UserError> {
        if self.store.set_user_role(email, role).await? {
            tracing::info!(email, role = %role, "Role updated");
            Ok(())
        } else {
            Err(UserError::NotFound(email.to_string()))
        }
    }
}
