//! `SeaORM` implementation of the `ProfileService` trait.

use async_trait::async_trait;

use crate::db::repositories::profile::Profile;
use crate::db::{ProfileFields, Store, is_unique_violation};
use crate::domain::FieldErrors;
use crate::domain::validation::{check_profile_text, check_username};
use crate::services::profile_service::{
    Actor, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT, ProfileError, ProfileInput, ProfileService,
};
use crate::services::token_service_impl::random_hex;

pub const USERNAME_TAKEN: &str = "This username is already taken";

pub struct SeaOrmProfileService {
    store: Store,
    default_image: String,
}

impl SeaOrmProfileService {
    #[must_use]
    pub const fn new(store: Store, default_image: String) -> Self {
        Self {
            store,
            default_image,
        }
    }

    fn normalize(input: ProfileInput) -> Result<ProfileFields, ProfileError> {
        let blank_to_none = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };

        let fields = ProfileFields {
            username: input.username.trim().to_string(),
            first_name: blank_to_none(input.first_name),
            last_name: blank_to_none(input.last_name),
            bio: blank_to_none(input.bio),
        };

        let mut errors = FieldErrors::new();
        check_username(&mut errors, &fields.username);
        check_profile_text(
            &mut errors,
            fields.first_name.as_deref(),
            fields.last_name.as_deref(),
            fields.bio.as_deref(),
        );
        errors.into_result().map_err(ProfileError::Validation)?;

        Ok(fields)
    }

    fn username_taken() -> ProfileError {
        ProfileError::Validation(FieldErrors::single("username", USERNAME_TAKEN))
    }

    fn map_write_error(err: anyhow::Error) -> ProfileError {
        if is_unique_violation(&err) {
            Self::username_taken()
        } else {
            err.into()
        }
    }

    async fn ensure_user(&self, user_id: i32) -> Result<(), ProfileError> {
        if user_id < 1 || self.store.get_user_by_id(user_id).await?.is_none() {
            return Err(ProfileError::NotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    /// Writes `fields` onto `user_id`'s profile, creating it if needed.
    async fn write_fields(
        &self,
        user_id: i32,
        existing: Option<Profile>,
        fields: ProfileFields,
    ) -> Result<Profile, ProfileError> {
        let repo = self.store.profile_repo();

        if repo.username_taken(&fields.username, user_id).await? {
            return Err(Self::username_taken());
        }

        match existing {
            Some(profile) => {
                let keep_image = profile.profile_image.is_some();
                let profile = repo
                    .update_fields(profile, fields)
                    .await
                    .map_err(Self::map_write_error)?;
                if keep_image {
                    Ok(profile)
                } else {
                    Ok(repo
                        .set_image(profile, Some(self.default_image.clone()))
                        .await?)
                }
            }
            None => repo
                .create(user_id, fields, Some(self.default_image.clone()))
                .await
                .map_err(Self::map_write_error),
        }
    }
}

#[async_trait]
impl ProfileService for SeaOrmProfileService {
    async fn get_profile(&self, id: i32) -> Result<Profile, ProfileError> {
        if id < 1 {
            return Err(ProfileError::NotFound(id.to_string()));
        }

        self.store
            .profile_repo()
            .get_by_id(id)
            .await?
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    async fn get_user_profile(&self, user_id: i32) -> Result<Profile, ProfileError> {
        self.ensure_user(user_id).await?;

        let repo = self.store.profile_repo();
        if let Some(profile) = repo.get_by_user_id(user_id).await? {
            return Ok(profile);
        }

        let fields = ProfileFields {
            username: format!("user_{}", random_hex(6)),
            ..Default::default()
        };

        match repo
            .create(user_id, fields, Some(self.default_image.clone()))
            .await
        {
            Ok(profile) => {
                tracing::debug!(user_id, profile_id = profile.id, "Created default profile");
                Ok(profile)
            }
            // A concurrent request created it first
            Err(e) if is_unique_violation(&e) => repo
                .get_by_user_id(user_id)
                .await?
                .ok_or_else(|| ProfileError::Internal(e.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_profiles_by_username(
        &self,
        username: &str,
        limit: Option<u64>,
    ) -> Result<Vec<Profile>, ProfileError> {
        let mut errors = FieldErrors::new();
        let query = username.trim();
        if query.is_empty() {
            errors.add("username", "Username query can not be empty");
        }
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        if limit < 1 {
            errors.add("limit", "Limit must be at least 1");
        }
        errors.into_result().map_err(ProfileError::InvalidQuery)?;

        Ok(self
            .store
            .profile_repo()
            .search_by_username(query, limit.min(MAX_SEARCH_LIMIT))
            .await?)
    }

    async fn create_or_update_profile(
        &self,
        user_id: i32,
        input: ProfileInput,
    ) -> Result<Profile, ProfileError> {
        let fields = Self::normalize(input)?;
        self.ensure_user(user_id).await?;

        let existing = self.store.profile_repo().get_by_user_id(user_id).await?;
        self.write_fields(user_id, existing, fields).await
    }

    async fn update_profile(
        &self,
        actor: Actor,
        profile_id: i32,
        input: ProfileInput,
    ) -> Result<Profile, ProfileError> {
        let profile = self.get_profile(profile_id).await?;

        if profile.user_id != actor.user_id && !actor.role.can_moderate() {
            tracing::warn!(
                actor = actor.user_id,
                profile_id,
                "Rejected update of another user's profile"
            );
            return Err(ProfileError::Forbidden);
        }

        let fields = Self::normalize(input)?;
        self.write_fields(profile.user_id, Some(profile), fields).await
    }

    async fn update_profile_picture(
        &self,
        user_id: i32,
        path: String,
    ) -> Result<Profile, ProfileError> {
        let profile = self.get_user_profile(user_id).await?;
        Ok(self.store.profile_repo().set_image(profile, Some(path)).await?)
    }

    async fn delete_profile_picture(&self, user_id: i32) -> Result<Profile, ProfileError> {
        let profile = self.get_user_profile(user_id).await?;
        Ok(self
            .store
            .profile_repo()
            .set_image(profile, Some(self.default_image.clone()))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::db::test_store;
    use crate::domain::UserRole;

    const DEFAULT_IMAGE: &str = "/images/default/pfp.webp";

    async fn setup(emails: &[&str]) -> (SeaOrmProfileService, Vec<i32>) {
        let store = test_store().await;
        let config = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        };
        let mut ids = Vec::new();
        for email in emails {
            ids.push(store.user_repo().create(email, "pw", &config).await.unwrap().id);
        }
        (
            SeaOrmProfileService::new(store, DEFAULT_IMAGE.to_string()),
            ids,
        )
    }

    fn input(username: &str) -> ProfileInput {
        ProfileInput {
            username: username.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn lazily_creates_default_profile_once() {
        let (service, ids) = setup(&["lazy@example.com"]).await;

        let first = service.get_user_profile(ids[0]).await.unwrap();
        assert!(first.username.starts_with("user_"));
        assert_eq!(first.username.len(), "user_".len() + 12);
        assert_eq!(first.profile_image.as_deref(), Some(DEFAULT_IMAGE));

        let second = service.get_user_profile(ids[0]).await.unwrap();
        assert_eq!(first.id, second.id);

        assert!(matches!(
            service.get_user_profile(999).await,
            Err(ProfileError::NotFound(_))
        ));
        assert!(matches!(service.get_profile(0).await, Err(ProfileError::NotFound(_))));
    }

    #[tokio::test]
    async fn upsert_validates_and_keeps_image() {
        let (service, ids) = setup(&["up@example.com"]).await;

        let created = service
            .create_or_update_profile(
                ids[0],
                ProfileInput {
                    username: "turing".into(),
                    first_name: Some("Alan".into()),
                    bio: Some("  ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.first_name.as_deref(), Some("Alan"));
        assert_eq!(created.bio, None);
        assert_eq!(created.profile_image.as_deref(), Some(DEFAULT_IMAGE));

        let pictured = service
            .update_profile_picture(ids[0], "/images/profile/aa/bb/x.webp".into())
            .await
            .unwrap();
        let updated = service
            .create_or_update_profile(ids[0], input("alan.turing"))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.first_name, None);
        assert_eq!(updated.profile_image, pictured.profile_image);

        let Err(ProfileError::Validation(errors)) = service
            .create_or_update_profile(
                ids[0],
                ProfileInput {
                    username: "bad name".into(),
                    bio: Some("b".repeat(256)),
                    ..Default::default()
                },
            )
            .await
        else {
            panic!("expected validation error");
        };
        assert!(errors.get("username").is_some());
        assert!(errors.get("bio").is_some());
    }

    #[tokio::test]
    async fn duplicate_username_is_validation_error() {
        let (service, ids) = setup(&["a@example.com", "b@example.com"]).await;
        service
            .create_or_update_profile(ids[0], input("taken"))
            .await
            .unwrap();

        let Err(ProfileError::Validation(errors)) = service
            .create_or_update_profile(ids[1], input("taken"))
            .await
        else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("username").unwrap(), [USERNAME_TAKEN.to_string()]);

        // Re-saving your own username is fine
        service
            .create_or_update_profile(ids[0], input("taken"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_requires_owner_or_moderator() {
        let (service, ids) = setup(&["owner@example.com", "other@example.com"]).await;
        let profile = service
            .create_or_update_profile(ids[0], input("owner"))
            .await
            .unwrap();

        let stranger = Actor {
            user_id: ids[1],
            role: UserRole::User,
        };
        assert!(matches!(
            service.update_profile(stranger, profile.id, input("hijack")).await,
            Err(ProfileError::Forbidden)
        ));

        let moderator = Actor {
            user_id: ids[1],
            role: UserRole::Moderator,
        };
        let moderated = service
            .update_profile(moderator, profile.id, input("renamed"))
            .await
            .unwrap();
        assert_eq!(moderated.user_id, ids[0]);
        assert_eq!(moderated.username, "renamed");

        let owner = Actor {
            user_id: ids[0],
            role: UserRole::User,
        };
        assert!(service.update_profile(owner, profile.id, input("mine")).await.is_ok());
    }

    #[tokio::test]
    async fn search_limits() {
        let (service, ids) = setup(&["s1@example.com", "s2@example.com", "s3@example.com"]).await;
        for (id, name) in ids.iter().zip(["neo", "neon", "trinity"]) {
            service
                .create_or_update_profile(*id, input(name))
                .await
                .unwrap();
        }

        let hits = service.find_profiles_by_username("ne", None).await.unwrap();
        assert_eq!(hits.len(), 2);
        let one = service.find_profiles_by_username("ne", Some(1)).await.unwrap();
        assert_eq!(one.len(), 1);

        assert!(matches!(
            service.find_profiles_by_username("ne", Some(0)).await,
            Err(ProfileError::InvalidQuery(_))
        ));
        assert!(matches!(
            service.find_profiles_by_username("  ", None).await,
            Err(ProfileError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn delete_picture_restores_default() {
        let (service, ids) = setup(&["pic@example.com"]).await;

        service
            .update_profile_picture(ids[0], "/images/profile/11/22/y.webp".into())
            .await
            .unwrap();
        let reset = service.delete_profile_picture(ids[0]).await.unwrap();
        assert_eq!(reset.profile_image.as_deref(), Some(DEFAULT_IMAGE));
    }
}
