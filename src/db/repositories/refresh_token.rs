use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};

use crate::entities::refresh_tokens;

pub type RefreshToken = refresh_tokens::Model;

pub struct RefreshTokenRepository {
    conn: DatabaseConnection,
}

impl RefreshTokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(
        &self,
        token: &str,
        user_id: i32,
        remember_me: bool,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken> {
        refresh_tokens::ActiveModel {
            token: Set(token.to_string()),
            user_id: Set(user_id),
            remember_me: Set(remember_me),
            expires_at: Set(expires_at),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert refresh token")
    }

    /// Looks up `token` and returns it only while it is unexpired at `now`.
    pub async fn find_valid(&self, token: &str, now: DateTime<Utc>) -> Result<Option<RefreshToken>> {
        let row = refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::Token.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query refresh token")?;

        Ok(row.filter(|t| t.is_valid_at(now)))
    }

    pub async fn delete_by_token(&self, token: &str) -> Result<u64> {
        let result = refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::Token.eq(token))
            .exec(&self.conn)
            .await
            .context("Failed to delete refresh token")?;

        Ok(result.rows_affected)
    }

    pub async fn delete_all_for_user(&self, user_id: i32) -> Result<u64> {
        let result = refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .exec(&self.conn)
            .await
            .context("Failed to delete refresh tokens for user")?;

        Ok(result.rows_affected)
    }

    /// Replaces `old` with a token carrying the same owner and `remember_me` flag.
    ///
    /// Runs in one transaction. Returns `None` when `old` was already consumed
    /// by a concurrent rotation, so each refresh token is redeemable once.
    pub async fn rotate(
        &self,
        old: &RefreshToken,
        new_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>> {
        let txn = self.conn.begin().await?;

        let deleted = refresh_tokens::Entity::delete_by_id(old.id)
            .exec(&txn)
            .await
            .context("Failed to delete rotated refresh token")?;

        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let fresh = refresh_tokens::ActiveModel {
            token: Set(new_token.to_string()),
            user_id: Set(old.user_id),
            remember_me: Set(old.remember_me),
            expires_at: Set(expires_at),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert rotated refresh token")?;

        txn.commit().await?;
        Ok(Some(fresh))
    }

    /// Deletes every token whose expiry is strictly before `now`.
    pub async fn clear_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::ExpiresAt.lt(now))
            .exec(&self.conn)
            .await
            .context("Failed to clear expired refresh tokens")?;

        Ok(result.rows_affected)
    }

    pub async fn count_for_user(&self, user_id: i32) -> Result<u64> {
        refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await
            .context("Failed to count refresh tokens")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::db::{Store, test_store};
    use chrono::Duration;

    async fn seed_user(store: &Store) -> i32 {
        let config = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        };
        store
            .user_repo()
            .create("tokens@example.com", "pw", &config)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn find_valid_respects_expiry() {
        let store = test_store().await;
        let repo = store.token_repo();
        let user_id = seed_user(&store).await;
        let now = Utc::now();

        repo.insert("live", user_id, false, now + Duration::hours(1))
            .await
            .unwrap();
        repo.insert("dead", user_id, false, now - Duration::seconds(1))
            .await
            .unwrap();

        assert!(repo.find_valid("live", now).await.unwrap().is_some());
        assert!(repo.find_valid("dead", now).await.unwrap().is_none());
        assert!(repo.find_valid("missing", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rotate_keeps_remember_me_and_is_single_use() {
        let store = test_store().await;
        let repo = store.token_repo();
        let user_id = seed_user(&store).await;
        let now = Utc::now();

        let old = repo
            .insert("first", user_id, true, now + Duration::days(30))
            .await
            .unwrap();

        let fresh = repo
            .rotate(&old, "second", now + Duration::days(30))
            .await
            .unwrap()
            .unwrap();
        assert!(fresh.remember_me);
        assert_eq!(fresh.user_id, user_id);
        assert!(repo.find_valid("first", now).await.unwrap().is_none());

        assert!(repo.rotate(&old, "third", now).await.unwrap().is_none());
        assert!(repo.find_valid("third", now).await.unwrap().is_none());
        assert_eq!(repo.count_for_user(user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_expired_only_removes_past_tokens() {
        let store = test_store().await;
        let repo = store.token_repo();
        let user_id = seed_user(&store).await;
        let now = Utc::now();

        repo.insert("a", user_id, false, now - Duration::hours(2))
            .await
            .unwrap();
        repo.insert("b", user_id, false, now - Duration::minutes(1))
            .await
            .unwrap();
        repo.insert("c", user_id, true, now + Duration::days(1))
            .await
            .unwrap();

        assert_eq!(repo.clear_expired(now).await.unwrap(), 2);
        assert_eq!(repo.count_for_user(user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_all_for_user_revokes_every_session() {
        let store = test_store().await;
        let repo = store.token_repo();
        let user_id = seed_user(&store).await;
        let later = Utc::now() + Duration::hours(1);

        for token in ["x", "y", "z"] {
            repo.insert(token, user_id, false, later).await.unwrap();
        }

        assert_eq!(repo.delete_by_token("x").await.unwrap(), 1);
        assert_eq!(repo.delete_all_for_user(user_id).await.unwrap(), 2);
        assert_eq!(store.count_refresh_tokens(user_id).await.unwrap(), 0);
    }
}
