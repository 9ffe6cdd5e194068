//! Loan fund API handlers

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
use crate::loan_fund::{CreateLoanFundRequest, LoanFund, LoanFundService, TopUpRequest};

pub async fn list_loan_funds(
    State(service): State<Arc<LoanFundService>>,
) -> Result<Json<Vec<LoanFund>>, ApiError> {
    Ok(Json(service.list().await?))
}

pub async fn create_loan_fund(
    State(service): State<Arc<LoanFundService>>,
    payload: Result<Json<CreateLoanFundRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LoanFund>), ApiError> {
    let request = json_body(payload, Entity::LoanFund)?;
    let new_fund = request
        .validate()
        .map_err(|errors| ApiError::invalid_fields(Entity::LoanFund, errors))?;

    let fund = service.create(new_fund).await?;
    Ok((StatusCode::CREATED, Json(fund)))
}

pub async fn get_loan_fund(
    State(service): State<Arc<LoanFundService>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<LoanFund>, ApiError> {
    let id = path_id(path, Entity::LoanFund)?;
    Ok(Json(service.get(id).await?))
}

/// Add the request amount to the fund balance
pub async fn top_up_loan_fund(
    State(service): State<Arc<LoanFundService>>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TopUpRequest>, JsonRejection>,
) -> Result<Json<LoanFund>, ApiError> {
    let id = path_id(path, Entity::LoanFund)?;
    let request = json_body(payload, Entity::LoanFund)?;
    let delta = request
        .delta()
        .map_err(|errors| ApiError::invalid_fields(Entity::LoanFund, errors))?;

    Ok(Json(service.top_up(id, delta).await?))
}

pub async fn delete_loan_fund(
    State(service): State<Arc<LoanFundService>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = path_id(path, Entity::LoanFund)?;
    service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
