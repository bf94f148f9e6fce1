use common::OrderId;
use thiserror::Error;

/// Errors that can occur when interacting with the store.
///
/// A missing record is never an error: lookups return `Option` and deletes
/// return whether the record existed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness or reference constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Conflict(String),

    /// An order total does not fit in the money range.
    #[error("Total of order {order_id} is out of range")]
    AmountOverflow { order_id: OrderId },

    /// A stored value could not be mapped back into a record.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
