//! Loan API handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{json_body, path_id};
use crate::error::{ApiError, Entity};
use crate::loan::{CreateLoanRequest, Loan, LoanActionResponse, LoanService};

pub async fn list_loans(
    State(service): State<Arc<LoanService>>,
) -> Result<Json<Vec<Loan>>, ApiError> {
    Ok(Json(service.list_all().await?))
}

pub async fn create_loan(
    State(service): State<Arc<LoanService>>,
    payload: Result<Json<CreateLoanRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Loan>), ApiError> {
    let request = json_body(payload, Entity::Loan)?;
    let loan = service.create_loan(&request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

pub async fn approve_loan(
    State(service): State<Arc<LoanService>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<LoanActionResponse>, ApiError> {
    let id = path_id(path, Entity::Loan)?;
    service.approve(id).await?;
    Ok(Json(LoanActionResponse {
        message: "Loan approved successfully.".to_string(),
    }))
}

pub async fn reject_loan(
    State(service): State<Arc<LoanService>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<LoanActionResponse>, ApiError> {
    let id = path_id(path, Entity::Loan)?;
    service.reject(id).await?;
    Ok(Json(LoanActionResponse {
        message: "Loan rejected successfully.".to_string(),
    }))
}

pub async fn delete_loan(
    State(service): State<Arc<LoanService>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = path_id(path, Entity::Loan)?;
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_loans_by_customer(
    State(service): State<Arc<LoanService>>,
    Path(customer_name): Path<String>,
) -> Result<Json<Vec<Loan>>, ApiError> {
    Ok(Json(service.list_by_customer_name(&customer_name).await?))
}
