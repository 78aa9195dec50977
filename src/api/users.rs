use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use std::sync::Arc;

use super::validation::parse_positive;
use super::{
    ApiError, ApiResponse, AppState, CredentialsRequest, PaginationQuery, ProfileData, ProfileDto,
    UserData, UserDto, UserListData,
};

const DEFAULT_PAGE: u64 = 1;
const DEFAULT_LIMIT: u64 = 10;

/// GET /users?page=&limit=
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<UserListData>>, ApiError> {
    let page = parse_positive("page", query.page.as_deref(), DEFAULT_PAGE)?;
    let limit = parse_positive("limit", query.limit.as_deref(), DEFAULT_LIMIT)?;

    let result = state.user_service().list_users(page, limit).await?;

    Ok(Json(ApiResponse::success(
        "User list",
        UserListData {
            users: result.users.into_iter().map(UserDto::from).collect(),
            meta: result.meta,
        },
    )))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<ApiResponse<UserData>>, ApiError> {
    let Path(id) = id?;
    let user = state.user_service().get_user(id).await?;

    Ok(Json(ApiResponse::success(
        "User found",
        UserData {
            user: UserDto::from(user),
        },
    )))
}

/// GET /users/{id}/profile
pub async fn get_user_profile(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<ApiResponse<ProfileData>>, ApiError> {
    let Path(id) = id?;
    let profile = state.profile_service().get_user_profile(id).await?;

    Ok(Json(ApiResponse::success(
        "Profile found",
        ProfileData {
            profile: ProfileDto::from_profile(profile, state.public_url()),
        },
    )))
}

/// POST /users/register
///
/// Creates an account without logging it in.
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<UserData>>), ApiError> {
    let Json(payload) = payload?;

    let user = state
        .user_service()
        .create_user(&payload.email, &payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "User created",
            UserData {
                user: UserDto::from(user),
            },
        )),
    ))
}
