use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::session::AuthError;
use crate::response::ApiResponse;

/// HTTP-level errors with envelope mapping. Responses never carry stack
/// traces, password hashes, or signing material.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        let body = ApiResponse::message_only(status, message);
        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::AlreadyExists => ApiError::Conflict("User already exists".into()),
            AuthError::Internal(inner) => ApiError::Internal(inner),
            // One generic message for every authentication sub-case.
            other => {
                warn!(reason = %other, "authentication failed");
                ApiError::Unauthorized("Invalid credentials".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_collapse_to_one_generic_message() {
        for e in [
            AuthError::MissingToken,
            AuthError::TokenExpired,
            AuthError::InvalidToken,
            AuthError::UserNotFound,
            AuthError::InvalidCredentials,
            AuthError::TokenMismatch,
        ] {
            match ApiError::from(e) {
                ApiError::Unauthorized(m) => assert_eq!(m, "Invalid credentials"),
                other => panic!("expected Unauthorized, got {other:?}"),
            }
        }
    }

    #[test]
    fn duplicate_user_maps_to_conflict() {
        assert!(matches!(
            ApiError::from(AuthError::AlreadyExists),
            ApiError::Conflict(_)
        ));
    }
}
