//! Middleware for the loan fund API
//!
//! Request tracing and bearer token authentication.

pub mod auth;
mod tracing;

pub use auth::{require_auth, AuthenticatedUser};
pub use self::tracing::request_tracing;
