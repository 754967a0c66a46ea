//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bank_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Creating the tables at startup failed.
    #[error("schema error: {0}")]
    Schema(#[source] sqlx::Error),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            DomainError::CommandMissing => (StatusCode::NOT_FOUND, "command_missing"),
            DomainError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "account_not_found"),
            DomainError::NegativeAmount(_) => (StatusCode::BAD_REQUEST, "negative_amount"),
            DomainError::InsufficientFunds { .. } => {
                (StatusCode::BAD_REQUEST, "insufficient_funds")
            }
            DomainError::InvalidOperation(_) => (StatusCode::BAD_REQUEST, "invalid_operation"),
            DomainError::ProjectionVersionMismatch { .. } => {
                (StatusCode::BAD_REQUEST, "projection_version_mismatch")
            }
            DomainError::AccountAlreadyExists { .. } => {
                (StatusCode::BAD_REQUEST, "account_already_exists")
            }
            DomainError::InconsistentEventStream { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "inconsistent_event_stream",
            ),
            DomainError::UnsupportedEventType(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "unsupported_event_type")
            }
            DomainError::EventPersistence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "event_persistence_failure")
            }
            DomainError::EventReplay(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "event_replay_failure")
            }
            DomainError::Snapshot(_) => (StatusCode::INTERNAL_SERVER_ERROR, "snapshot_failure"),
            DomainError::Projection(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "projection_failure")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self.0, code = error_code, "command failed");
        }

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn status_of(err: DomainError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    #[test]
    fn test_missing_command_and_unknown_account_map_to_404() {
        assert_eq!(status_of(DomainError::CommandMissing), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(DomainError::AccountNotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_rejected_commands_map_to_400() {
        let id = Uuid::new_v4();
        let errors = [
            DomainError::NegativeAmount("-5".into()),
            DomainError::InsufficientFunds {
                available: Decimal::from(60),
                requested: Decimal::from(1000),
            },
            DomainError::InvalidOperation("account holder name cannot be empty".into()),
            DomainError::ProjectionVersionMismatch {
                aggregate_id: id,
                expected: 3,
                actual: 1,
                offset: 7,
            },
            DomainError::AccountAlreadyExists {
                aggregate_id: id,
                version: 2,
                offset: 4,
            },
        ];

        for err in errors {
            let message = err.to_string();
            assert_eq!(status_of(err), StatusCode::BAD_REQUEST, "{message}");
        }
    }

    #[test]
    fn test_store_failures_map_to_500() {
        let errors = [
            DomainError::InconsistentEventStream {
                aggregate_id: Uuid::new_v4(),
                expected: 2,
                actual: 4,
                offset: 9,
            },
            DomainError::UnsupportedEventType("account.closed".into()),
            DomainError::EventPersistence("broker down".into()),
            DomainError::EventReplay("timed out".into()),
            DomainError::Snapshot("table missing".into()),
            DomainError::Projection("db down".into()),
        ];

        for err in errors {
            let message = err.to_string();
            assert_eq!(
                status_of(err),
                StatusCode::INTERNAL_SERVER_ERROR,
                "{message}"
            );
        }
    }

    #[test]
    fn test_error_code_names_the_variant() {
        let error = ApiError(DomainError::InsufficientFunds {
            available: Decimal::ONE,
            requested: Decimal::TEN,
        });

        let (_, code) = error.status_and_code();

        assert_eq!(code, "insufficient_funds");
    }
}
