//! Domain error types.

use common::{CategoryId, ParseEnumError, ProductId, RoleId, UserId};
use store::StoreError;
use thiserror::Error;

/// Input rejected before any store call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("quantity for product {product_id} must be greater than 0 (got {quantity})")]
    NonPositiveQuantity { product_id: ProductId, quantity: i64 },

    #[error("quantity for product {product_id} is too large (got {quantity})")]
    QuantityTooLarge { product_id: ProductId, quantity: i64 },

    #[error("order total is out of range")]
    TotalTooLarge,

    #[error(transparent)]
    InvalidToken(#[from] ParseEnumError),

    #[error("invalid date '{0}' (expected RFC 3339 or YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("client {0} does not exist")]
    UnknownClient(UserId),

    #[error("category {id} does not exist. Available categories: {available}")]
    UnknownCategory { id: CategoryId, available: String },

    #[error("role {0} does not exist")]
    UnknownRole(RoleId),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("invalid price {0} (must be a finite amount >= 0)")]
    InvalidPrice(String),

    #[error("stock must not be negative (got {0})")]
    NegativeStock(i32),

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("invalid email address '{0}'")]
    InvalidEmail(String),
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The request was rejected by validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown email or wrong password. Both look the same to the caller.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Hashing or verifying a password failed for a reason other than a
    /// mismatch.
    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl DomainError {
    /// Maps a store rejection of the reconciled total to a validation error.
    pub(crate) fn from_reconcile(e: StoreError) -> Self {
        match e {
            StoreError::AmountOverflow { .. } => ValidationError::TotalTooLarge.into(),
            other => other.into(),
        }
    }
}

impl From<ParseEnumError> for DomainError {
    fn from(e: ParseEnumError) -> Self {
        DomainError::Validation(e.into())
    }
}
