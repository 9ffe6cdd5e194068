//! Authentication module
//!
//! - User records with bcrypt password hashes
//! - Password login issuing HS256 access tokens
//! - Token verification for gated routes

mod crypto;
mod jwt;
pub mod model;
mod service;

pub use crypto::{hash_password, verify_password, CryptoError};
pub use jwt::{generate_access_token, verify_token, Claims, JwtError};
pub use model::*;
pub use service::{AuthError, AuthService, INVALID_CREDENTIALS, LOGIN_SUCCEEDED};
