//! Argon2 password hashing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand_core::OsRng;

use crate::error::DomainError;

/// Hashes a plain-text password with a fresh random salt.
///
/// Returns the PHC string to store.
#[tracing::instrument(skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::PasswordHash(e.to_string()))
}

/// Checks a plain-text password against a stored PHC string.
///
/// A mismatch is `Ok(false)`; a malformed stored hash is an error.
#[tracing::instrument(skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, password: &str) -> Result<bool, DomainError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| DomainError::PasswordHash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(DomainError::PasswordHash(e.to_string())),
    }
}
