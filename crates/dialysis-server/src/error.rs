//! API error types with structured JSON responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dialysis_core::{AllocError, ClinicError};
use serde::Serialize;

/// Error response body: `{"error": {"code", "message", "details"?}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Validation failed")]
    Validation(Vec<String>),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, None)
            }
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "Request failed validation".to_string(),
                Some(errors),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail, None),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail, None),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ClinicError> for ApiError {
    fn from(err: ClinicError) -> Self {
        match err {
            ClinicError::Validation(errors) => ApiError::Validation(errors),
            ClinicError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            ClinicError::Allocation(AllocError::InvalidDate(_)) => {
                ApiError::BadRequest(err.to_string())
            }
            ClinicError::Allocation(AllocError::Exhausted { .. }) => {
                ApiError::Conflict(err.to_string())
            }
            ClinicError::Allocation(AllocError::StorageUnavailable(_))
            | ClinicError::Store(_)
            | ClinicError::LockPoisoned => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialysis_core::StoreError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ClinicError::Validation(vec!["x".into()]), StatusCode::BAD_REQUEST),
            (
                ClinicError::NotFound {
                    kind: "patient",
                    id: "20250614/001".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ClinicError::Allocation(AllocError::InvalidDate("soon".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ClinicError::Allocation(AllocError::Exhausted {
                    date: "20250614".into(),
                }),
                StatusCode::CONFLICT,
            ),
            (
                ClinicError::Store(StoreError::LockPoisoned),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ClinicError::LockPoisoned, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
