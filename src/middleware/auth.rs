//! Authentication middleware
//!
//! Bearer token verification for route groups that require a signed-in user.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use crate::auth::{AuthService, Principal};
use crate::error::ApiError;

/// Authenticated user extracted from the bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

/// Extractor for authenticated users
///
/// Verifies the token in the `Authorization` header and checks that its user still
/// exists.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(AuthenticatedUser(user): AuthenticatedUser) -> String {
///     format!("Hello, {}", user.username)
/// }
/// ```
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthorized(
                        "Authorization header with Bearer token required".to_string(),
                    )
                    .into_response()
                })?;

        let auth_service = Arc::<AuthService>::from_ref(state);

        let principal = auth_service
            .authenticate(bearer.token())
            .await
            .map_err(|e| ApiError::from(e).into_response())?;

        Ok(AuthenticatedUser(principal))
    }
}

/// Reject requests without a valid bearer token.
///
/// The resolved user is stored in the request extensions for downstream handlers.
pub async fn require_auth(user: AuthenticatedUser, mut request: Request, next: Next) -> Response {
    tracing::debug!(user_id = user.0.user_id, "Request authenticated");
    request.extensions_mut().insert(user);
    next.run(request).await
}
