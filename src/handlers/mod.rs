//! API handlers for the loan fund backend

pub mod health;
pub mod loan;
pub mod loan_fund;
pub mod user;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path,
    },
    Json,
};

use crate::error::{ApiError, ApiResult, Entity};

pub use health::{health_check, root};
pub use loan::*;
pub use loan_fund::*;
pub use user::*;

// Re-export AuthenticatedUser from middleware for handler use
pub use crate::middleware::auth::AuthenticatedUser;

/// Unwrap a JSON body, reporting malformed input in the usual error shape
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>, entity: Entity) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::invalid(entity, rejection.body_text()))
}

/// Unwrap a numeric path id
pub(crate) fn path_id(path: Result<Path<i64>, PathRejection>, entity: Entity) -> ApiResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::invalid(entity, "A valid integer id is required."))
}
