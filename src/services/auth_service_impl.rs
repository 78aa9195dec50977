//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::SecurityConfig;
use crate::db::repositories::refresh_token::RefreshToken;
use crate::db::{Store, User, is_unique_violation};
use crate::domain::FieldErrors;
use crate::domain::validation::{check_email, check_new_password, check_required};
use crate::services::auth_service::{AuthError, AuthService, AuthSession};
use crate::services::jwt::JwtService;
use crate::services::token_service::RefreshTokenService;

pub const EMAIL_TAKEN: &str = "This email is already registered";

pub struct SeaOrmAuthService {
    store: Store,
    jwt: Arc<JwtService>,
    tokens: Arc<dyn RefreshTokenService>,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        jwt: Arc<JwtService>,
        tokens: Arc<dyn RefreshTokenService>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            store,
            jwt,
            tokens,
            security,
        }
    }

    async fn open_session(&self, user: User, remember_me: bool) -> Result<AuthSession, AuthError> {
        let access_token = self.jwt.issue(&user)?;
        let refresh_token = self.tokens.create_token(user.id, remember_me).await?;

        Ok(AuthSession {
            user,
            access_token,
            refresh_token,
        })
    }

    async fn valid_token(&self, refresh_token: &str) -> Result<RefreshToken, AuthError> {
        self.tokens
            .find_valid_token(refresh_token)
            .await?
            .ok_or(AuthError::Unauthorized)
    }
}

/// Shared by `/api/auth/register` and `/api/users/register`.
pub(crate) async fn create_account(
    store: &Store,
    security: &SecurityConfig,
    email: &str,
    password: &str,
) -> Result<User, AuthError> {
    let email = email.trim();

    let mut errors = FieldErrors::new();
    check_email(&mut errors, email);
    check_new_password(&mut errors, "password", password);
    errors.into_result().map_err(AuthError::Validation)?;

    if store.user_repo().email_exists(email).await? {
        return Err(AuthError::Validation(FieldErrors::single("email", EMAIL_TAKEN)));
    }

    match store.user_repo().create(email, password, security).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, "User registered");
            Ok(user)
        }
        // Lost a race with a concurrent registration of the same email
        Err(e) if is_unique_violation(&e) => {
            Err(AuthError::Validation(FieldErrors::single("email", EMAIL_TAKEN)))
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<AuthSession, AuthError> {
        let user = create_account(&self.store, &self.security, email, password).await?;
        self.open_session(user, remember_me).await
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<AuthSession, AuthError> {
        let mut errors = FieldErrors::new();
        check_required(&mut errors, "email", email);
        check_required(&mut errors, "password", password);
        errors.into_result().map_err(AuthError::Validation)?;

        let Some(user) = self
            .store
            .user_repo()
            .verify_password(email.trim(), password)
            .await?
        else {
            metrics::counter!("auth_logins_total", "outcome" => "failure").increment(1);
            return Err(AuthError::InvalidCredentials);
        };

        metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);
        self.open_session(user, remember_me).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let current = self.valid_token(refresh_token).await?;

        let user = self
            .store
            .get_user_by_id(current.user_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let access_token = self.jwt.issue(&user)?;
        let refresh_token = self.tokens.rotate_token(&current).await?;

        Ok(AuthSession {
            user,
            access_token,
            refresh_token,
        })
    }

    async fn terminate_current(&self, refresh_token: &str) -> Result<(), AuthError> {
        let current = self.valid_token(refresh_token).await?;
        self.tokens.delete_token(&current).await?;
        Ok(())
    }

    async fn terminate_all(&self, refresh_token: &str) -> Result<u64, AuthError> {
        let current = self.valid_token(refresh_token).await?;
        let removed = self
            .tokens
            .delete_all_tokens_from_user(current.user_id)
            .await?;

        tracing::info!(user_id = current.user_id, removed, "Terminated all sessions");
        Ok(removed)
    }

    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let mut errors = FieldErrors::new();
        check_required(&mut errors, "current_password", current_password);
        check_new_password(&mut errors, "new_password", new_password);
        if !current_password.is_empty() && current_password == new_password {
            errors.add(
                "new_password",
                "New password must be different from current password",
            );
        }
        errors.into_result().map_err(AuthError::Validation)?;

        if self.store.get_user_by_id(user_id).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }

        let is_valid = self
            .store
            .user_repo()
            .verify_password_by_id(user_id, current_password)
            .await?;

        if !is_valid {
            return Err(AuthError::Validation(FieldErrors::single(
                "current_password",
                "Current password is incorrect",
            )));
        }

        self.store
            .user_repo()
            .update_password(user_id, new_password, &self.security)
            .await?;

        let revoked = self.tokens.delete_all_tokens_from_user(user_id).await?;
        tracing::info!(user_id, revoked, "Password changed");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::db::test_store;
    use crate::services::token_service_impl::SeaOrmRefreshTokenService;

    const PASSWORD: &str = "Sup3r$ecret-Passw0rd!";

    async fn service() -> (SeaOrmAuthService, Store) {
        let store = test_store().await;
        let auth = AuthConfig::default();
        let tokens = Arc::new(SeaOrmRefreshTokenService::new(store.clone(), &auth));
        let service = SeaOrmAuthService::new(
            store.clone(),
            Arc::new(JwtService::new(&auth)),
            tokens,
            SecurityConfig {
                argon2_memory_cost_kib: 1024,
                argon2_time_cost: 1,
                argon2_parallelism: 1,
            },
        );
        (service, store)
    }

    #[tokio::test]
    async fn register_then_login() {
        let (service, _store) = service().await;

        let session = service
            .register("new@example.com", PASSWORD, false)
            .await
            .unwrap();
        assert_eq!(session.user.email, "new@example.com");
        assert_eq!(session.refresh_token.user_id, session.user.id);
        assert!(!session.refresh_token.remember_me);

        let login = service
            .login("new@example.com", PASSWORD, true)
            .await
            .unwrap();
        assert_eq!(login.user.id, session.user.id);
        assert!(login.refresh_token.remember_me);
    }

    #[tokio::test]
    async fn register_reports_field_errors() {
        let (service, _store) = service().await;

        let Err(AuthError::Validation(errors)) =
            service.register("not-an-email", "password", false).await
        else {
            panic!("expected validation error");
        };
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
    }

    #[tokio::test]
    async fn duplicate_email_is_validation_error() {
        let (service, _store) = service().await;
        service
            .register("twice@example.com", PASSWORD, false)
            .await
            .unwrap();

        let Err(AuthError::Validation(errors)) =
            service.register("twice@example.com", PASSWORD, false).await
        else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("email").unwrap(), [EMAIL_TAKEN.to_string()]);
    }

    #[tokio::test]
    async fn wrong_credentials_are_rejected() {
        let (service, _store) = service().await;
        service
            .register("who@example.com", PASSWORD, false)
            .await
            .unwrap();

        assert!(matches!(
            service.login("who@example.com", "wrong", false).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("nobody@example.com", PASSWORD, false).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn refresh_rotates_and_rejects_reuse() {
        let (service, _store) = service().await;
        let session = service
            .register("rot@example.com", PASSWORD, true)
            .await
            .unwrap();

        let refreshed = service.refresh(&session.refresh_token.token).await.unwrap();
        assert_ne!(refreshed.refresh_token.token, session.refresh_token.token);
        assert!(refreshed.refresh_token.remember_me);

        assert!(matches!(
            service.refresh(&session.refresh_token.token).await,
            Err(AuthError::Unauthorized)
        ));
        assert!(matches!(service.refresh("").await, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn terminate_all_revokes_every_session() {
        let (service, store) = service().await;
        let first = service
            .register("multi@example.com", PASSWORD, false)
            .await
            .unwrap();
        let second = service
            .login("multi@example.com", PASSWORD, false)
            .await
            .unwrap();

        assert_eq!(service.terminate_all(&second.refresh_token.token).await.unwrap(), 2);
        assert_eq!(store.count_refresh_tokens(first.user.id).await.unwrap(), 0);
        assert!(matches!(
            service.terminate_current(&first.refresh_token.token).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn change_password_revokes_sessions() {
        let (service, store) = service().await;
        let session = service
            .register("pw@example.com", PASSWORD, false)
            .await
            .unwrap();

        let new_password = "An0ther-Str0ng#Passphrase";
        assert!(matches!(
            service
                .change_password(session.user.id, "wrong", new_password)
                .await,
            Err(AuthError::Validation(_))
        ));

        service
            .change_password(session.user.id, PASSWORD, new_password)
            .await
            .unwrap();

        assert_eq!(store.count_refresh_tokens(session.user.id).await.unwrap(), 0);
        assert!(service.login("pw@example.com", new_password, false).await.is_ok());
        assert!(matches!(
            service.login("pw@example.com", PASSWORD, false).await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
