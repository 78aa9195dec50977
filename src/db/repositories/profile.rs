use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::user_profiles;

pub type Profile = user_profiles::Model;

/// Editable profile columns; `None` clears optional fields.
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

pub struct ProfileRepository {
    conn: DatabaseConnection,
}

impl ProfileRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Profile>> {
        user_profiles::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query profile by ID")
    }

    pub async fn get_by_user_id(&self, user_id: i32) -> Result<Option<Profile>> {
        user_profiles::Entity::find()
            .filter(user_profiles::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query profile by user ID")
    }

    /// Whether `username` belongs to a profile other than `user_id`'s.
    pub async fn username_taken(&self, username: &str, user_id: i32) -> Result<bool> {
        let count = user_profiles::Entity::find()
            .filter(user_profiles::Column::Username.eq(username))
            .filter(user_profiles::Column::UserId.ne(user_id))
            .count(&self.conn)
            .await
            .context("Failed to check username uniqueness")?;

        Ok(count > 0)
    }

    /// Substring match on username, alphabetical.
    pub async fn search_by_username(&self, query: &str, limit: u64) -> Result<Vec<Profile>> {
        user_profiles::Entity::find()
            .filter(user_profiles::Column::Username.contains(query))
            .order_by_asc(user_profiles::Column::Username)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to search profiles")
    }

    /// Insert a fresh profile for `user_id`.
    pub async fn create(
        &self,
        user_id: i32,
        fields: ProfileFields,
        profile_image: Option<String>,
    ) -> Result<Profile> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = user_profiles::ActiveModel {
            user_id: Set(user_id),
            username: Set(fields.username),
            first_name: Set(fields.first_name),
            last_name: Set(fields.last_name),
            bio: Set(fields.bio),
            profile_image: Set(profile_image),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert profile")
    }

    pub async fn update_fields(&self, profile: Profile, fields: ProfileFields) -> Result<Profile> {
        let mut active: user_profiles::ActiveModel = profile.into();
        active.username = Set(fields.username);
        active.first_name = Set(fields.first_name);
        active.last_name = Set(fields.last_name);
        active.bio = Set(fields.bio);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        active
            .update(&self.conn)
            .await
            .context("Failed to update profile")
    }

    pub async fn set_image(&self, profile: Profile, profile_image: Option<String>) -> Result<Profile> {
        let mut active: user_profiles::ActiveModel = profile.into();
        active.profile_image = Set(profile_image);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        active
            .update(&self.conn)
            .await
            .context("Failed to update profile image")
    }
}
