use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested row does not exist.
    #[error("Row not found: {0}")]
    NotFound(String),

    /// A stock adjustment would take `unit_in_stock` below zero.
    #[error("Insufficient stock for game {game_id}: requested {requested}, available {available}")]
    InsufficientStock {
        game_id: common::GameId,
        requested: u32,
        available: u32,
    },

    /// The customer already has an Open order; the uniqueness constraint
    /// on (customer_id, Open) refused the insert.
    #[error("Customer {0} already has an open cart")]
    OpenCartExists(common::CustomerId),

    /// A status transition was attempted on an order that is not Open.
    #[error("Order {0} is not open")]
    NotOpen(common::OrderId),

    /// A concurrency conflict occurred when writing a line.
    /// The expected quantity did not match the stored quantity.
    #[error("Concurrency conflict for line {line_id}: expected quantity {expected}, found {actual}")]
    ConcurrencyConflict {
        line_id: common::LineId,
        expected: u32,
        actual: u32,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
