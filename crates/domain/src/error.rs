//! Domain error types.

use common::{GameId, LineId, OrderId};
use store::StoreError;
use thiserror::Error;

use crate::payment::PaymentError;

/// Errors that can occur during cart and order operations.
///
/// Four kinds: not-found (surfaced as-is), business-rule violations
/// (raised at the point of detection, never silently corrected), upstream
/// payment failures (wrapped with context), and unexpected storage
/// failures (rewrapped so sqlx types never cross the service boundary).
#[derive(Debug, Error)]
pub enum OrderError {
    /// The referenced game does not exist.
    #[error("Game not found: {0}")]
    GameNotFound(String),

    /// The referenced order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The referenced order line does not exist.
    #[error("Order line not found: {0}")]
    LineNotFound(String),

    /// The customer has no open cart.
    #[error("Customer {0} has no open cart")]
    CartNotFound(common::CustomerId),

    /// The cart holds no lines to pay for.
    #[error("Order {0} has no lines")]
    EmptyCart(OrderId),

    /// The game is soft-deleted or has no stock left.
    #[error("Game '{0}' is unavailable")]
    Unavailable(String),

    /// The requested quantity cannot be covered by available stock.
    #[error("Requested {requested} of game {game_id}, only {available} available")]
    InsufficientStock {
        game_id: GameId,
        requested: u32,
        available: u32,
    },

    /// A line quantity must be at least 1.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// The line changed between the caller's read and write; re-read and
    /// retry.
    #[error("Line {0} was modified concurrently")]
    ConcurrentEdit(LineId),

    /// The order has left the Open state and its lines are immutable.
    #[error("Order {0} is no longer open")]
    OrderNotOpen(OrderId),

    /// The order was already shipped.
    #[error("Order {0} has already been shipped")]
    AlreadyShipped(OrderId),

    /// The requested payment method is not in the catalog.
    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),

    /// The payment collaborator failed.
    #[error("Payment failed: {0}")]
    Payment(#[from] PaymentError),

    /// An unexpected storage failure.
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl OrderError {
    /// Maps a store refusal for a specific line id to the domain taxonomy.
    pub(crate) fn line_not_found(id: LineId) -> Self {
        OrderError::LineNotFound(id.to_string())
    }
}
