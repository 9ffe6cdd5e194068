//! Authentication service
//!
//! User records, password login and bearer token verification.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, Entity};
use crate::store::{RecordStore, StoreError};
use crate::validation::FieldErrors;

use super::crypto::{hash_password, verify_password, CryptoError};
use super::jwt::{generate_access_token, verify_token, JwtError};
use super::model::{
    CreateUserRequest, LoginRequest, LoginResponse, NewUser, Principal, UpdateUserRequest, User,
    UserChanges,
};

pub const LOGIN_SUCCEEDED: &str = "User logged in successfully.";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Invalid user data")]
    Validation(FieldErrors),

    #[error("Password hashing error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate(_) => AuthError::UsernameTaken,
            other => AuthError::Store(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()),
            AuthError::InvalidToken(_) => {
                ApiError::Unauthorized("Invalid or expired token".to_string())
            }
            AuthError::Token(JwtError::TokenExpired) => {
                ApiError::Unauthorized("Token expired".to_string())
            }
            AuthError::Token(JwtError::EncodingFailed(msg)) => ApiError::Internal(msg),
            AuthError::Token(_) => ApiError::Unauthorized("Invalid or expired token".to_string()),
            AuthError::UserNotFound => ApiError::not_found(Entity::User, "User not found."),
            AuthError::UsernameTaken => {
                let mut errors = FieldErrors::new();
                errors.reject_with("username", USERNAME_TAKEN);
                ApiError::invalid_fields(Entity::User, errors)
            }
            AuthError::Validation(errors) => ApiError::invalid_fields(Entity::User, errors),
            AuthError::Crypto(err) => ApiError::Internal(err.to_string()),
            AuthError::Store(err) => ApiError::Store(err),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn RecordStore>,
    jwt_secret: String,
    access_token_ttl_seconds: i64,
    bcrypt_cost: u32,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        store: Arc<dyn RecordStore>,
        jwt_secret: String,
        access_token_ttl_seconds: i64,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            store,
            jwt_secret,
            access_token_ttl_seconds,
            bcrypt_cost,
        }
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_users().await?)
    }

    pub async fn get_user(&self, id: i64) -> Result<User, AuthError> {
        let mut tx = self.store.begin().await?;
        tx.find_user(id).await?.ok_or(AuthError::UserNotFound)
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::Validation(e.into()))?;

        let password_hash = hash_password(request.password, self.bcrypt_cost).await?;

        let mut tx = self.store.begin().await?;
        if tx.find_user_by_username(&request.username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        let user = tx
            .insert_user(&NewUser {
                username: request.username,
                email: request.email,
                password_hash,
            })
            .await?;
        tx.commit().await?;

        tracing::info!(user_id = user.id, username = %user.username, "User created");
        Ok(user)
    }

    /// Replace a user's details; the password changes only when one is given
    pub async fn update_user(
        &self,
        id: i64,
        request: UpdateUserRequest,
    ) -> Result<User, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::Validation(e.into()))?;

        let password_hash = match request.password {
            Some(password) => Some(hash_password(password, self.bcrypt_cost).await?),
            None => None,
        };

        let mut tx = self.store.begin().await?;
        if tx.find_user(id).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }
        let user = tx
            .update_user(
                id,
                &UserChanges {
                    username: request.username,
                    email: request.email,
                    password_hash,
                },
            )
            .await?;
        tx.commit().await?;

        tracing::info!(user_id = id, "User updated");
        Ok(user)
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), AuthError> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_user(id).await? {
            return Err(AuthError::UserNotFound);
        }
        tx.commit().await?;

        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Check credentials and issue an access token
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        let user = {
            let mut tx = self.store.begin().await?;
            tx.find_user_by_username(&request.username).await?
        };

        let Some(user) = user else {
            tracing::debug!(username = %request.username, "Login for unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        match verify_password(request.password, user.password_hash.clone()).await {
            Ok(true) => {}
            Ok(false) => return Err(AuthError::InvalidCredentials),
            Err(CryptoError::MalformedHash(reason)) => {
                tracing::warn!(user_id = user.id, %reason, "Stored password hash is unusable");
                return Err(AuthError::InvalidCredentials);
            }
            Err(err) => return Err(err.into()),
        }

        let jti = Uuid::new_v4().to_string();
        let token = generate_access_token(
            &user,
            &jti,
            &self.jwt_secret,
            self.access_token_ttl_seconds,
        )?;

        tracing::info!(user_id = user.id, username = %user.username, "User logged in");

        Ok(LoginResponse {
            message: LOGIN_SUCCEEDED.to_string(),
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_ttl_seconds,
        })
    }

    /// Resolve a bearer token to the user it was issued for
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = verify_token(token, &self.jwt_secret)?;
        let user_id = claims.user_id()?;

        let mut tx = self.store.begin().await?;
        let user = tx
            .find_user(user_id)
            .await?
            .ok_or_else(|| AuthError::InvalidToken("user no longer exists".to_string()))?;

        Ok(Principal {
            user_id: user.id,
            username: user.username,
            jti: claims.jti,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use axum::http::StatusCode;

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(MemoryStore::new()),
            "test-secret-key".to_string(),
            900,
            4,
        )
    }

    fn create_request(username: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            email: Some(format!("{username}@example.com")),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let service = service();
        let user = service
            .create_user(create_request("testuser", "testpassword"))
            .await
            .unwrap();
        assert_ne!(user.password_hash, "testpassword");

        let response = service
            .login(LoginRequest {
                username: "testuser".to_string(),
                password: "testpassword".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.message, LOGIN_SUCCEEDED);
        assert_eq!(response.token_type, "Bearer");

        let principal = service.authenticate(&response.token).await.unwrap();
        assert_eq!(principal.user_id, user.id);
        assert_eq!(principal.username, "testuser");
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let service = service();
        service
            .create_user(create_request("testuser", "testpassword"))
            .await
            .unwrap();

        let err = service
            .login(LoginRequest {
                username: "testuser".to_string(),
                password: "nope".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(ApiError::from(err).status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_field_error() {
        let service = service();
        service
            .create_user(create_request("testuser", "testpassword"))
            .await
            .unwrap();

        let err = service
            .create_user(create_request("testuser", "other"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
        assert_eq!(ApiError::from(err).status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_token_for_deleted_user_rejected() {
        let service = service();
        let user = service
            .create_user(create_request("testuser", "testpassword"))
            .await
            .unwrap();
        let response = service
            .login(LoginRequest {
                username: "testuser".to_string(),
                password: "testpassword".to_string(),
            })
            .await
            .unwrap();

        service.delete_user(user.id).await.unwrap();
        assert!(service.authenticate(&response.token).await.is_err());
    }

    #[tokio::test]
    async fn test_update_keeps_password_when_omitted() {
        let service = service();
        let user = service
            .create_user(create_request("testuser", "testpassword"))
            .await
            .unwrap();

        let updated = service
            .update_user(
                user.id,
                UpdateUserRequest {
                    username: "renamed".to_string(),
                    email: None,
                    password: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username, "renamed");
        assert_eq!(updated.password_hash, user.password_hash);
    }
}
