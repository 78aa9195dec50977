//! `SeaORM` implementation of the `RefreshTokenService` trait.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;

use crate::config::{AuthConfig, MAX_TTL_SECONDS};
use crate::db::Store;
use crate::db::repositories::refresh_token::RefreshToken;
use crate::services::token_service::{RefreshTokenService, TokenError};

/// Lower-case hex of `len` random bytes.
#[must_use]
pub fn random_hex(len: usize) -> String {
    let mut rng = rand::rng();

    (0..len).fold(String::with_capacity(len * 2), |mut acc, _| {
        use std::fmt::Write;
        let byte: u8 = rng.random();
        let _ = write!(acc, "{byte:02x}");
        acc
    })
}

/// 32 random bytes, hex encoded.
#[must_use]
pub fn generate_token() -> String {
    random_hex(32)
}

pub struct SeaOrmRefreshTokenService {
    store: Store,
    remember_me_ttl: Duration,
    session_ttl: Duration,
}

impl SeaOrmRefreshTokenService {
    #[must_use]
    pub fn new(store: Store, config: &AuthConfig) -> Self {
        Self {
            store,
            remember_me_ttl: Duration::seconds(
                config.remember_me_ttl_seconds.clamp(1, MAX_TTL_SECONDS),
            ),
            session_ttl: Duration::seconds(
                config.session_ttl_seconds.clamp(1, MAX_TTL_SECONDS),
            ),
        }
    }

    const fn ttl(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.remember_me_ttl
        } else {
            self.session_ttl
        }
    }
}

#[async_trait]
impl RefreshTokenService for SeaOrmRefreshTokenService {
    async fn create_token(
        &self,
        user_id: i32,
        remember_me: bool,
    ) -> Result<RefreshToken, TokenError> {
        let expires_at = Utc::now() + self.ttl(remember_me);
        let token = self
            .store
            .token_repo()
            .insert(&generate_token(), user_id, remember_me, expires_at)
            .await?;

        Ok(token)
    }

    async fn find_valid_token(&self, token: &str) -> Result<Option<RefreshToken>, TokenError> {
        if token.is_empty() {
            return Ok(None);
        }

        Ok(self.store.token_repo().find_valid(token, Utc::now()).await?)
    }

    async fn rotate_token(&self, old: &RefreshToken) -> Result<RefreshToken, TokenError> {
        let expires_at = Utc::now() + self.ttl(old.remember_me);

        let rotated = self
            .store
            .token_repo()
            .rotate(old, &generate_token(), expires_at)
            .await?
            .ok_or(TokenError::Unauthorized)?;

        metrics::counter!("auth_refresh_rotations_total").increment(1);
        Ok(rotated)
    }

    async fn delete_token(&self, token: &RefreshToken) -> Result<(), TokenError> {
        self.store.token_repo().delete_by_token(&token.token).await?;
        Ok(())
    }

    async fn delete_all_tokens_from_user(&self, user_id: i32) -> Result<u64, TokenError> {
        Ok(self.store.token_repo().delete_all_for_user(user_id).await?)
    }

    async fn clear_expired(&self) -> Result<u64, TokenError> {
        let removed = self.store.token_repo().clear_expired(Utc::now()).await?;
        metrics::counter!("auth_tokens_pruned_total").increment(removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::db::test_store;

    async fn setup() -> (SeaOrmRefreshTokenService, Store, i32) {
        let store = test_store().await;
        let user = store
            .user_repo()
            .create(
                "refresh@example.com",
                "pw",
                &SecurityConfig {
                    argon2_memory_cost_kib: 1024,
                    argon2_time_cost: 1,
                    argon2_parallelism: 1,
                },
            )
            .await
            .unwrap();
        let service = SeaOrmRefreshTokenService::new(store.clone(), &AuthConfig::default());
        (service, store, user.id)
    }

    #[test]
    fn generated_tokens_are_64_hex_chars() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
        assert_eq!(random_hex(6).len(), 12);
    }

    #[tokio::test]
    async fn ttl_follows_remember_me() {
        let (service, _store, user_id) = setup().await;
        let now = Utc::now();

        let long = service.create_token(user_id, true).await.unwrap();
        let short = service.create_token(user_id, false).await.unwrap();

        let long_ttl = long.expires_at - now;
        let short_ttl = short.expires_at - now;
        assert!(long_ttl > Duration::days(29) && long_ttl <= Duration::days(30));
        assert!(short_ttl > Duration::hours(2) && short_ttl <= Duration::hours(3));
    }

    #[tokio::test]
    async fn empty_token_is_never_found() {
        let (service, _store, _) = setup().await;
        assert!(service.find_valid_token("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rotation_invalidates_old_token() {
        let (service, _store, user_id) = setup().await;

        let old = service.create_token(user_id, true).await.unwrap();
        let new = service.rotate_token(&old).await.unwrap();

        assert_ne!(old.token, new.token);
        assert_eq!(new.user_id, user_id);
        assert!(new.remember_me);
        assert!(service.find_valid_token(&old.token).await.unwrap().is_none());
        assert!(service.find_valid_token(&new.token).await.unwrap().is_some());

        let reuse = service.rotate_token(&old).await;
        assert!(matches!(reuse, Err(TokenError::Unauthorized)));
    }

    #[tokio::test]
    async fn delete_all_invalidates_every_token() {
        let (service, store, user_id) = setup().await;

        let tokens = vec![
            service.create_token(user_id, true).await.unwrap(),
            service.create_token(user_id, false).await.unwrap(),
        ];
        assert_eq!(service.delete_all_tokens_from_user(user_id).await.unwrap(), 2);

        for token in tokens {
            assert!(service.find_valid_token(&token.token).await.unwrap().is_none());
        }
        assert_eq!(store.count_refresh_tokens(user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_token_revokes_only_that_session() {
        let (service, _store, user_id) = setup().await;

        let a = service.create_token(user_id, false).await.unwrap();
        let b = service.create_token(user_id, false).await.unwrap();
        service.delete_token(&a).await.unwrap();

        assert!(service.find_valid_token(&a.token).await.unwrap().is_none());
        assert!(service.find_valid_token(&b.token).await.unwrap().is_some());
    }
}
