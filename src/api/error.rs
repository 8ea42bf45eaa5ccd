use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable kind, e.g. `validation_error`
    pub error: String,
    pub message: String,
}

/// Errors surfaced by the HTTP layer
#[derive(Debug)]
pub enum ApiError {
    /// Bad message, unknown agent, or a body that does not fit the schema
    Validation(String),
    /// Unknown session
    NotFound(String),
    /// A thread could not be created
    Unavailable(String),
    /// The runtime rejected a read
    Runtime(String),
    /// Body was not JSON at all; axum's own rejection
    Rejected(JsonRejection),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidInput(message) => Self::Validation(message),
            DomainError::SessionNotFound(session_id) => {
                Self::NotFound(format!("Chat session {session_id} not found"))
            }
            DomainError::RemoteUnavailable(message) => Self::Unavailable(message),
            other @ (DomainError::ConfigurationMissing(_) | DomainError::Runtime(_)) => {
                Self::Runtime(other.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => Self::Validation(e.body_text()),
            other => Self::Rejected(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, "validation_error", message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, "session_not_found", message),
            Self::Unavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, "remote_unavailable", message)
            }
            Self::Runtime(message) => (StatusCode::BAD_GATEWAY, "runtime_error", message),
            Self::Rejected(rejection) => return rejection.into_response(),
        };
        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::RuntimeError;

    #[test]
    fn test_domain_errors_map_to_status_codes() {
        let cases = [
            (
                DomainError::InvalidInput("empty".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                DomainError::SessionNotFound("s1".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                DomainError::RemoteUnavailable("down".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DomainError::Runtime(RuntimeError::NotFound("thread_x".to_string())),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }
}
