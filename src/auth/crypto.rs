//! Password hashing
//!
//! bcrypt is CPU bound, so hashing and verification run on the blocking pool.

use thiserror::Error;

/// Errors that can occur while hashing or checking a password
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Password hashing failed: {0}")]
    HashFailed(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("Hashing task failed: {0}")]
    TaskFailed(String),
}

/// Hash a password with the given bcrypt cost
pub async fn hash_password(password: String, cost: u32) -> Result<String, CryptoError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| CryptoError::TaskFailed(e.to_string()))?
        .map_err(|e| CryptoError::HashFailed(e.to_string()))
}

/// Check a password against a stored bcrypt hash
pub async fn verify_password(password: String, hash: String) -> Result<bool, CryptoError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| CryptoError::TaskFailed(e.to_string()))?
        .map_err(|e| CryptoError::MalformedHash(e.to_string()))
}
