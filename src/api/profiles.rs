use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
    },
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::{parse_optional_positive, validate_search_query};
use super::{
    ApiError, ApiResponse, AppState, ProfileData, ProfileDto, ProfileListData, ProfileRequest,
    SearchQuery,
};
use crate::db::repositories::profile::Profile;
use crate::services::image::PROFILE_FOLDER;

const IMAGE_FIELD: &str = "image";

type ProfileResponse = Result<Json<ApiResponse<ProfileData>>, ApiError>;

fn profile_response(state: &AppState, message: &str, profile: Profile) -> ProfileResponse {
    Ok(Json(ApiResponse::success(
        message,
        ProfileData {
            profile: ProfileDto::from_profile(profile, state.public_url()),
        },
    )))
}

/// GET /profiles/me
pub async fn my_profile(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> ProfileResponse {
    let profile = state.profile_service().get_user_profile(current.id).await?;
    profile_response(&state, "Profile found", profile)
}

/// GET /profiles/search?username=&limit=
pub async fn search_profiles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<ProfileListData>>, ApiError> {
    let username = validate_search_query("username", query.username.as_deref())?;
    let limit = parse_optional_positive("limit", query.limit.as_deref())?;

    let profiles = state
        .profile_service()
        .find_profiles_by_username(&username, limit)
        .await?;

    let public_url = state.public_url();
    Ok(Json(ApiResponse::success(
        format!("{} profile(s) found", profiles.len()),
        ProfileListData {
            profiles: profiles
                .into_iter()
                .map(|p| ProfileDto::from_profile(p, public_url))
                .collect(),
        },
    )))
}

/// GET /profiles/{id}
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i32>, PathRejection>,
) -> ProfileResponse {
    let Path(id) = id?;
    let profile = state.profile_service().get_profile(id).await?;
    profile_response(&state, "Profile found", profile)
}

/// POST|PUT /profiles
pub async fn upsert_profile(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    payload: Result<Json<ProfileRequest>, JsonRejection>,
) -> ProfileResponse {
    let Json(payload) = payload?;

    let profile = state
        .profile_service()
        .create_or_update_profile(current.id, payload.into())
        .await?;

    profile_response(&state, "Profile saved", profile)
}

/// PUT /profiles/{id}
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<ProfileRequest>, JsonRejection>,
) -> ProfileResponse {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let profile = state
        .profile_service()
        .update_profile(current.actor(), id, payload.into())
        .await?;

    profile_response(&state, "Profile updated", profile)
}

/// POST /profiles/picture (multipart, field `image`)
pub async fn upload_picture(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ProfileResponse {
    let mut multipart = multipart?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            upload = Some(field.bytes().await?);
            break;
        }
    }

    let data = upload.ok_or_else(|| ApiError::bad_request(IMAGE_FIELD, "No image uploaded"))?;

    let path = state
        .image_service()
        .save_image(data.to_vec(), PROFILE_FOLDER)
        .await?;

    let profile = state
        .profile_service()
        .update_profile_picture(current.id, path)
        .await?;

    profile_response(&state, "Profile picture updated", profile)
}

/// DELETE /profiles/picture
pub async fn delete_picture(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> ProfileResponse {
    let profile = state
        .profile_service()
        .delete_profile_picture(current.id)
        .await?;

    profile_response(&state, "Profile picture removed", profile)
}
