//! Centralized API error handling
//!
//! Every service returns [`ApiError`]. The HTTP status for an error is decided by the
//! entity it concerns as well as its kind: a missing loan is a 400, a missing loan fund a
//! 404. The mapping lives in one table instead of being spread across handlers.

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;
use crate::validation::FieldErrors;

/// Record type an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Entity {
    LoanFund,
    Loan,
    User,
}

/// Coarse error classification used for status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    EmptyLookup,
    Unauthorized,
    Internal,
}

/// Per-entity overrides. Anything not listed falls back to [`default_status`].
const STATUS_POLICY: &[(Entity, ErrorKind, StatusCode)] = &[
    (Entity::LoanFund, ErrorKind::NotFound, StatusCode::NOT_FOUND),
    (Entity::Loan, ErrorKind::NotFound, StatusCode::BAD_REQUEST),
    (Entity::Loan, ErrorKind::EmptyLookup, StatusCode::NOT_FOUND),
    (Entity::User, ErrorKind::NotFound, StatusCode::NOT_FOUND),
];

fn default_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound | ErrorKind::EmptyLookup => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Resolve the status code for an error about `entity`
pub fn status_for(entity: Option<Entity>, kind: ErrorKind) -> StatusCode {
    entity
        .and_then(|entity| {
            STATUS_POLICY
                .iter()
                .find(|(e, k, _)| *e == entity && *k == kind)
                .map(|(_, _, status)| *status)
        })
        .unwrap_or_else(|| default_status(kind))
}

/// Error payload: a single message or a field -> message map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Fields(BTreeMap<String, String>),
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorDetail::Message(message) => f.write_str(message),
            ErrorDetail::Fields(fields) => {
                let joined = fields
                    .iter()
                    .map(|(field, message)| format!("{field}: {message}"))
                    .collect::<Vec<_>>()
                    .join("; ");
                f.write_str(&joined)
            }
        }
    }
}

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {detail}")]
    Validation { entity: Entity, detail: ErrorDetail },

    #[error("Resource not found: {message}")]
    NotFound { entity: Entity, message: String },

    #[error("Empty result: {message}")]
    EmptyLookup { entity: Entity, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

impl ApiError {
    /// Single-message validation failure
    pub fn invalid(entity: Entity, message: impl Into<String>) -> Self {
        ApiError::Validation {
            entity,
            detail: ErrorDetail::Message(message.into()),
        }
    }

    /// Field-level validation failure
    pub fn invalid_fields(entity: Entity, errors: FieldErrors) -> Self {
        ApiError::Validation {
            entity,
            detail: ErrorDetail::Fields(errors.into_map()),
        }
    }

    pub fn not_found(entity: Entity, message: impl Into<String>) -> Self {
        ApiError::NotFound {
            entity,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::EmptyLookup { .. } => ErrorKind::EmptyLookup,
            ApiError::Unauthorized(_) => ErrorKind::Unauthorized,
            ApiError::Store(_) | ApiError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn entity(&self) -> Option<Entity> {
        match self {
            ApiError::Validation { entity, .. }
            | ApiError::NotFound { entity, .. }
            | ApiError::EmptyLookup { entity, .. } => Some(*entity),
            _ => None,
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        status_for(self.entity(), self.kind())
    }

    /// Body sent to the client; store internals are not exposed
    pub fn detail(&self) -> ErrorDetail {
        match self {
            ApiError::Validation { detail, .. } => detail.clone(),
            ApiError::NotFound { message, .. } | ApiError::EmptyLookup { message, .. } => {
                ErrorDetail::Message(message.clone())
            }
            ApiError::Unauthorized(message) => ErrorDetail::Message(message.clone()),
            ApiError::Store(_) | ApiError::Internal(_) => {
                ErrorDetail::Message("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Server error occurred");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Client error occurred");
        }

        let body = ErrorResponse {
            error: self.detail(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_loan_is_bad_request() {
        let err = ApiError::not_found(Entity::Loan, "Loan with the provided id does not exist.");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_fund_and_user_are_not_found() {
        assert_eq!(
            ApiError::not_found(Entity::LoanFund, "gone").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::not_found(Entity::User, "gone").status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_empty_customer_lookup_is_not_found() {
        let err = ApiError::EmptyLookup {
            entity: Entity::Loan,
            message: "none".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_kind_defaults() {
        assert_eq!(
            ApiError::invalid(Entity::LoanFund, "bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("Invalid credentials".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Store(StoreError::Database("boom".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_detail_serializes_untagged() {
        let message = serde_json::to_value(ErrorResponse {
            error: ErrorDetail::Message("Amount Exceeds Funds".to_string()),
        })
        .unwrap();
        assert_eq!(message, serde_json::json!({ "error": "Amount Exceeds Funds" }));

        let mut errors = FieldErrors::new();
        errors.reject("loan_duration");
        let fields = serde_json::to_value(ErrorResponse {
            error: ApiError::invalid_fields(Entity::LoanFund, errors).detail(),
        })
        .unwrap();
        assert_eq!(
            fields,
            serde_json::json!({
                "error": { "loan_duration": "The loan duration must be greater than or equal to 2." }
            })
        );
    }

    #[test]
    fn test_store_details_are_hidden() {
        let err = ApiError::Store(StoreError::Database("password=hunter2".to_string()));
        assert_eq!(
            err.detail(),
            ErrorDetail::Message("Internal server error".to_string())
        );
    }
}
