use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::interview::store::StoreError;
use crate::interview::InterviewError;
use crate::llm_client::{LlmError, OracleError};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed oracle response: {0}")]
    MalformedOracleResponse(String),

    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(#[from] LlmError),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Interview(#[from] InterviewError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<OracleError> for AppError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Unavailable(e) => AppError::OracleUnavailable(e),
            OracleError::Malformed(e) => AppError::MalformedOracleResponse(e.to_string()),
        }
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_MEDIA_TYPE",
                msg.clone(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::MalformedOracleResponse(msg) => {
                tracing::error!("Malformed oracle response: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MALFORMED_ORACLE_RESPONSE",
                    "The AI service returned an unusable response; please retry".to_string(),
                )
            }
            AppError::OracleUnavailable(e) => {
                tracing::error!("Oracle unavailable: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "ORACLE_UNAVAILABLE",
                    "The AI service is currently unavailable; please retry".to_string(),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg.clone())
            }
            AppError::Interview(e) => interview_parts(e),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

fn interview_parts(err: &InterviewError) -> (StatusCode, &'static str, String) {
    match err {
        InterviewError::Validation(msg) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        InterviewError::SessionNotFound(_) => {
            (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", err.to_string())
        }
        InterviewError::SessionCompleted(_) => {
            (StatusCode::CONFLICT, "SESSION_COMPLETED", err.to_string())
        }
        InterviewError::SessionInProgress(_) => {
            (StatusCode::CONFLICT, "SESSION_IN_PROGRESS", err.to_string())
        }
        InterviewError::StaleTurn { .. } => (StatusCode::CONFLICT, "STALE_TURN", err.to_string()),
        InterviewError::MalformedOracleResponse(e) => {
            AppError::MalformedOracleResponse(e.to_string()).parts()
        }
        InterviewError::OracleUnavailable(e) => {
            tracing::error!("Oracle unavailable: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "ORACLE_UNAVAILABLE",
                "The AI service is currently unavailable; please retry".to_string(),
            )
        }
        InterviewError::AnalysisUnavailable(msg) => {
            tracing::error!("Performance analysis failed: {msg}");
            (
                StatusCode::BAD_GATEWAY,
                "ANALYSIS_UNAVAILABLE",
                "The performance analysis could not be produced; please retry".to_string(),
            )
        }
        InterviewError::Store(StoreError::Conflict(_)) | InterviewError::Store(StoreError::Duplicate) => {
            (StatusCode::CONFLICT, "CONFLICT", err.to_string())
        }
        InterviewError::Store(StoreError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", err.to_string())
        }
        InterviewError::Store(StoreError::Database(e)) => {
            tracing::error!("Database error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_interview_errors_map_to_statuses() {
        let cases = [
            (
                AppError::from(InterviewError::SessionNotFound(Uuid::nil())),
                StatusCode::NOT_FOUND,
                "SESSION_NOT_FOUND",
            ),
            (
                AppError::from(InterviewError::StaleTurn {
                    requested: 2,
                    actual: 3,
                }),
                StatusCode::CONFLICT,
                "STALE_TURN",
            ),
            (
                AppError::from(InterviewError::OracleUnavailable(LlmError::EmptyContent)),
                StatusCode::SERVICE_UNAVAILABLE,
                "ORACLE_UNAVAILABLE",
            ),
            (
                AppError::from(InterviewError::MalformedOracleResponse(
                    crate::llm_client::ExtractError::NoJsonFound,
                )),
                StatusCode::BAD_GATEWAY,
                "MALFORMED_ORACLE_RESPONSE",
            ),
            (
                AppError::from(InterviewError::Store(StoreError::Conflict(Uuid::nil()))),
                StatusCode::CONFLICT,
                "CONFLICT",
            ),
        ];

        for (err, status, code) in cases {
            let (got_status, got_code, _) = err.parts();
            assert_eq!(got_status, status);
            assert_eq!(got_code, code);
        }
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = AppError::Internal(anyhow::anyhow!("secret connection string"));
        let (status, _, message) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("secret"));
    }
}
