//! User-related API handlers

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
use crate::auth::{
    AuthService, CreateUserRequest, LoginRequest, LoginResponse, UpdateUserRequest, User,
    INVALID_CREDENTIALS,
};
use crate::error::{ApiError, Entity};

pub async fn list_users(
    State(service): State<Arc<AuthService>>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(service.list_users().await?))
}

pub async fn create_user(
    State(service): State<Arc<AuthService>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let request = json_body(payload, Entity::User)?;
    let user = service.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get a user by ID
pub async fn get_user(
    State(service): State<Arc<AuthService>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<User>, ApiError> {
    let id = path_id(path, Entity::User)?;
    Ok(Json(service.get_user(id).await?))
}

pub async fn update_user(
    State(service): State<Arc<AuthService>>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let id = path_id(path, Entity::User)?;
    let request = json_body(payload, Entity::User)?;
    Ok(Json(service.update_user(id, request).await?))
}

pub async fn delete_user(
    State(service): State<Arc<AuthService>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = path_id(path, Entity::User)?;
    service.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Exchange credentials for an access token
pub async fn login(
    State(service): State<Arc<AuthService>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    // an incomplete body is just another failed login
    let Ok(Json(request)) = payload else {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    };
    Ok(Json(service.login(request).await?))
}
