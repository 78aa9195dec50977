use axum::{
    Json,
    body::Body,
    extract::{
        Request,
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::domain::FieldErrors;
use crate::services::{AuthError, ImageError, ProfileError, UserError};

#[derive(Debug)]
pub enum ApiError {
    /// Malformed request or query parameters.
    BadRequest { message: String, errors: FieldErrors },

    /// Payload field validation, including uniqueness violations.
    Validation { message: String, errors: FieldErrors },

    Unauthorized(String),

    Forbidden(String),

    NotFound(String),

    PayloadTooLarge(String),

    UnsupportedMediaType(String),

    DatabaseError(String),

    InternalError(String),
}

/// Detail of a 500 response, attached as a response extension.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest { message, errors } => write!(f, "Bad request: {message} ({errors})"),
            Self::Validation { message, errors } => write!(f, "Validation error: {message} ({errors})"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::PayloadTooLarge(msg) => write!(f, "Payload too large: {msg}"),
            Self::UnsupportedMediaType(msg) => write!(f, "Unsupported media type: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request(field: &str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: "Invalid request".to_string(),
            errors: FieldErrors::single(field, message),
        }
    }

    pub fn validation(errors: FieldErrors) -> Self {
        Self::Validation {
            message: "Validation failed".to_string(),
            errors,
        }
    }

    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id} not found"))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut detail = None;

        let body = match self {
            Self::BadRequest { message, errors } | Self::Validation { message, errors } => {
                ApiResponse::<()>::error(message, Some(errors))
            }
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::PayloadTooLarge(msg)
            | Self::UnsupportedMediaType(msg) => ApiResponse::<()>::error(msg, None),
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                detail = Some(msg);
                ApiResponse::<()>::error("A database error occurred", None)
            }
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                detail = Some(msg);
                ApiResponse::<()>::error("An internal error occurred", None)
            }
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(detail) = detail {
            response.extensions_mut().insert(ErrorDetail(detail));
        }
        response
    }
}

/// Copies [`ErrorDetail`] into the `debug` field of error envelopes.
/// Only installed in the `dev` environment.
pub async fn expose_error_details(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    let Some(ErrorDetail(detail)) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let Ok(bytes) = axum::body::to_bytes(body, usize::MAX).await else {
        return (parts.status, "An internal error occurred").into_response();
    };

    let mut value: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };
    if let Some(object) = value.as_object_mut() {
        object.insert("debug".to_string(), serde_json::json!({ "message": detail }));
    }

    let body = value.to_string();
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(body))
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                Self::UnsupportedMediaType("Expected an application/json body".to_string())
            }
            other => Self::bad_request("body", other.body_text()),
        }
    }
}

/// Unparseable ids can never match a row.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        match rejection {
            PathRejection::FailedToDeserializePathParams(_) => {
                Self::NotFound("Resource not found".to_string())
            }
            other => Self::internal(other.body_text()),
        }
    }
}

/// Fallback for unmatched routes.
pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::UnsupportedMediaType(rejection.body_text())
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge("Uploaded file is too large".to_string())
        } else {
            Self::bad_request("image", err.body_text())
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized("Incorrect credentials".to_string()),
            AuthError::Unauthorized => {
                Self::Unauthorized("Refresh token is invalid or expired".to_string())
            }
            AuthError::UserNotFound => Self::NotFound("User not found".to_string()),
            AuthError::Validation(errors) => Self::validation(errors),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(id) => Self::not_found("User", id),
            UserError::InvalidQuery(errors) => Self::BadRequest {
                message: "Invalid query parameters".to_string(),
                errors,
            },
            UserError::Validation(errors) => Self::validation(errors),
            UserError::Database(msg) => Self::DatabaseError(msg),
            UserError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound(what) => Self::NotFound(format!("Profile not found: {what}")),
            ProfileError::Forbidden => {
                Self::Forbidden("You are not allowed to modify this profile".to_string())
            }
            ProfileError::InvalidQuery(errors) => Self::BadRequest {
                message: "Invalid query parameters".to_string(),
                errors,
            },
            ProfileError::Validation(errors) => Self::validation(errors),
            ProfileError::Database(msg) => Self::DatabaseError(msg),
            ProfileError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Empty => Self::bad_request("image", "Uploaded file is empty"),
            ImageError::TooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            ImageError::Unsupported(_) => {
                Self::UnsupportedMediaType("File is not a supported image".to_string())
            }
            ImageError::Internal(msg) => Self::InternalError(msg),
        }
    }
}
