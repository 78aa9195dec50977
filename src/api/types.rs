use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::User;
use crate::db::repositories::profile::Profile;
use crate::domain::{FieldErrors, UserRole};
use crate::services::{AuthSession, PageMeta, ProfileInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// JSON envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<serde_json::Value>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            data: Some(data),
            errors: None,
            debug: None,
        }
    }

    pub fn success_message(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            data: None,
            errors: None,
            debug: None,
        }
    }

    pub fn error(message: impl Into<String>, errors: Option<FieldErrors>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
            data: None,
            errors: errors.filter(|e| !e.is_empty()),
            debug: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub email: String,
    pub role: UserRole,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileDto {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProfileDto {
    /// Relative `/images/...` paths get `public_url` prepended when set.
    #[must_use]
    pub fn from_profile(profile: Profile, public_url: Option<&str>) -> Self {
        let profile_image = profile.profile_image.map(|path| match public_url {
            Some(base) if path.starts_with('/') => {
                format!("{}{path}", base.trim_end_matches('/'))
            }
            _ => path,
        });

        Self {
            id: profile.id,
            user_id: profile.user_id,
            username: profile.username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            bio: profile.bio,
            profile_image,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserDto,
}

impl From<&AuthSession> for AuthPayload {
    fn from(session: &AuthSession) -> Self {
        Self {
            access_token: session.access_token.token.clone(),
            expires_at: session.access_token.expires_at,
            user: UserDto::from(session.user.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: UserDto,
}

#[derive(Debug, Serialize)]
pub struct MeData {
    pub user: UserDto,
    pub profile: ProfileDto,
}

#[derive(Debug, Serialize)]
pub struct UserListData {
    pub users: Vec<UserDto>,
    pub meta: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct ProfileData {
    pub profile: ProfileDto,
}

#[derive(Debug, Serialize)]
pub struct ProfileListData {
    pub profiles: Vec<ProfileDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "rememberMe")]
    pub remember_me: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default, alias = "currentPassword")]
    pub current_password: String,
    #[serde(default, alias = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl From<ProfileRequest> for ProfileInput {
    fn from(req: ProfileRequest) -> Self {
        Self {
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
            bio: req.bio,
        }
    }
}

/// Raw query values; parsed in `validation` so bad input gets the envelope.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub username: Option<String>,
    pub limit: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(image: Option<&str>) -> Profile {
        Profile {
            id: 1,
            user_id: 2,
            username: "alice".to_string(),
            first_name: None,
            last_name: None,
            bio: None,
            profile_image: image.map(str::to_string),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn envelope_omits_empty_parts() {
        let ok = serde_json::to_value(ApiResponse::success("Done", 1)).unwrap();
        assert_eq!(ok["status"], "success");
        assert_eq!(ok["data"], 1);
        assert!(ok.get("errors").is_none());

        let err = serde_json::to_value(ApiResponse::<()>::error(
            "Nope",
            Some(FieldErrors::single("email", "Email can not be empty")),
        ))
        .unwrap();
        assert_eq!(err["status"], "error");
        assert_eq!(err["errors"]["email"][0], "Email can not be empty");
        assert!(err.get("data").is_none());

        let bare = serde_json::to_value(ApiResponse::<()>::error("Nope", Some(FieldErrors::new())))
            .unwrap();
        assert!(bare.get("errors").is_none());
    }

    #[test]
    fn profile_image_gets_public_url() {
        let dto = ProfileDto::from_profile(
            profile(Some("/images/profile/ab/cd/x.webp")),
            Some("https://api.example.com/"),
        );
        assert_eq!(
            dto.profile_image.as_deref(),
            Some("https://api.example.com/images/profile/ab/cd/x.webp")
        );

        let dto = ProfileDto::from_profile(profile(Some("/images/default/pfp.webp")), None);
        assert_eq!(dto.profile_image.as_deref(), Some("/images/default/pfp.webp"));

        assert!(ProfileDto::from_profile(profile(None), Some("https://x")).profile_image.is_none());
    }

    #[test]
    fn credentials_accept_camel_case_flag() {
        let req: CredentialsRequest =
            serde_json::from_str(r#"{"email":"a@b.co","password":"pw","rememberMe":true}"#).unwrap();
        assert!(req.remember_me);

        let req: CredentialsRequest = serde_json::from_str(r#"{"email":"a@b.co"}"#).unwrap();
        assert!(!req.remember_me);
        assert!(req.password.is_empty());
    }
}
