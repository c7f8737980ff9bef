use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::store::{ClassUpdateError, StoreError};
use crate::toggle::ToggleError;
use crate::validation::FieldError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Validation(Vec<FieldError>),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::Validation(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response()
            }
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Unavailable(err) => {
                error!("storage unavailable: {err}");
                ApiError::Unavailable("Storage temporarily unavailable".into())
            }
            StoreError::MissingReference => {
                ApiError::NotFound("Referenced class or member not found".into())
            }
            StoreError::Database(err) => {
                error!("database error: {err}");
                ApiError::Internal("Database error occurred".into())
            }
        }
    }
}

impl From<ToggleError> for ApiError {
    fn from(value: ToggleError) -> Self {
        match value {
            ToggleError::ClassNotFound(_) | ToggleError::MemberNotFound(_) => {
                ApiError::NotFound(value.to_string())
            }
            ToggleError::ClassFull(_) => ApiError::Conflict(value.to_string()),
            ToggleError::StorageUnavailable(err) => {
                error!("booking toggle failed: {err}");
                ApiError::Unavailable("Storage temporarily unavailable".into())
            }
        }
    }
}

impl From<ClassUpdateError> for ApiError {
    fn from(value: ClassUpdateError) -> Self {
        match value {
            ClassUpdateError::NotFound => ApiError::NotFound("Class not found".into()),
            ClassUpdateError::Conflict => ApiError::Conflict(
                "Class was modified by someone else; reload and try again".into(),
            ),
            ClassUpdateError::Store(err) => err.into(),
        }
    }
}
