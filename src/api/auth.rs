use axum::{
    Json,
    extract::{FromRequestParts, Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::cookies::header_value;
use super::observability::RequestSpan;
use super::{
    ApiError, ApiResponse, AppState, AuthPayload, ChangePasswordRequest, CredentialsRequest,
    MeData, ProfileDto, UserDto,
};
use crate::domain::UserRole;
use crate::services::{Actor, AuthSession};

/// Identity taken from a verified access token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            role: self.role,
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Requires `Authorization: Bearer <jwt>` and stores [`CurrentUser`] in the
/// request extensions.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let claims = state.jwt().verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        ApiError::unauthorized("Invalid or expired access token")
    })?;

    let id = claims
        .user_id()
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired access token"))?;

    if let Some(RequestSpan(span)) = request.extensions().get::<RequestSpan>() {
        span.record("user_id", id);
    }
    request.extensions_mut().insert(CurrentUser {
        id,
        email: claims.email,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn session_response(state: &AppState, status: StatusCode, message: &str, session: &AuthSession) -> Response {
    let body = ApiResponse::success(message, AuthPayload::from(session));
    let mut response = (status, Json(body)).into_response();
    if let Some(value) = header_value(&state.refresh_cookie.issue(&session.refresh_token)) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

fn clear_cookie(state: &AppState, mut response: Response) -> Response {
    if let Some(value) = header_value(&state.refresh_cookie.clear()) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

fn refresh_token(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    state
        .refresh_cookie
        .read(headers)
        .ok_or_else(|| ApiError::unauthorized("Refresh token is missing"))
}

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;

    let session = state
        .auth_service()
        .register(&payload.email, &payload.password, payload.remember_me)
        .await?;

    Ok(session_response(
        &state,
        StatusCode::CREATED,
        "User registered",
        &session,
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;

    let session = state
        .auth_service()
        .login(&payload.email, &payload.password, payload.remember_me)
        .await?;

    Ok(session_response(&state, StatusCode::OK, "Access granted", &session))
}

/// POST /auth/token/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = refresh_token(&state, &headers)?;
    let session = state.auth_service().refresh(&token).await?;

    Ok(session_response(&state, StatusCode::OK, "Token refreshed", &session))
}

/// POST /auth/token/terminate/current
pub async fn terminate_current(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = refresh_token(&state, &headers)?;
    state.auth_service().terminate_current(&token).await?;

    Ok(clear_cookie(&state, StatusCode::NO_CONTENT.into_response()))
}

/// POST /auth/token/terminate/all
pub async fn terminate_all(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = refresh_token(&state, &headers)?;
    let revoked = state.auth_service().terminate_all(&token).await?;
    tracing::info!(revoked, "Terminated all sessions");

    Ok(clear_cookie(&state, StatusCode::NO_CONTENT.into_response()))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<MeData>>, ApiError> {
    let user = state.user_service().get_user(current.id).await?;
    let profile = state.profile_service().get_user_profile(current.id).await?;

    Ok(Json(ApiResponse::success(
        "Current user",
        MeData {
            user: UserDto::from(user),
            profile: ProfileDto::from_profile(profile, state.public_url()),
        },
    )))
}

/// PUT /auth/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;

    state
        .auth_service()
        .change_password(current.id, &payload.current_password, &payload.new_password)
        .await?;

    let body = ApiResponse::<()>::success_message("Password changed, please log in again");
    Ok(clear_cookie(&state, (StatusCode::OK, Json(body)).into_response()))
}
