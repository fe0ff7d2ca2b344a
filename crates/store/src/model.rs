//! Entity rows persisted by the store.

use chrono::{DateTime, Utc};
use common::{CustomerId, GameId, LineId, Money, OrderId};
use serde::{Deserialize, Serialize};

use crate::status::OrderStatus;

/// A game in the catalog.
///
/// `unit_in_stock` is the shared inventory counter: units not currently
/// reserved by any open cart. It is mutated only through
/// [`crate::GameRepository::adjust_stock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Unique game identifier.
    pub id: GameId,

    /// Unique URL slug.
    pub key: String,

    /// Display name.
    pub name: String,

    /// Unit price; snapshotted onto lines at add-to-cart time.
    pub price: Money,

    /// Units available, i.e. not reserved by any open cart.
    pub unit_in_stock: u32,

    /// Discount percentage applied at sale time.
    pub discount: u8,

    /// Soft-delete flag; a deleted game can never enter a cart.
    pub is_deleted: bool,
}

impl Game {
    /// Creates a catalog entry with no discount and not deleted.
    pub fn new(key: impl Into<String>, name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self {
            id: GameId::new(),
            key: key.into(),
            name: name.into(),
            price,
            unit_in_stock: stock,
            discount: 0,
            is_deleted: false,
        }
    }
}

/// An order. While `status` is Open this row is the customer's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,

    /// The customer who owns the order.
    pub customer_id: CustomerId,

    /// Set when the order leaves the Open state.
    pub date: Option<DateTime<Utc>>,

    /// Current lifecycle status.
    pub status: OrderStatus,
}

impl Order {
    /// Creates a fresh Open order (cart) for a customer.
    pub fn open(customer_id: CustomerId) -> Self {
        Self {
            id: OrderId::new(),
            customer_id,
            date: None,
            status: OrderStatus::Open,
        }
    }
}

/// One product's quantity and price within one order.
///
/// `(order_id, game_id)` is unique: re-adding a product merges into the
/// existing line instead of inserting a second one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Unique line identifier.
    pub id: LineId,

    /// The owning order.
    pub order_id: OrderId,

    /// The product on this line.
    pub game_id: GameId,

    /// Unit price captured when the line was created or last updated.
    pub price: Money,

    /// Units reserved by this line; always at least 1.
    pub quantity: u32,

    /// Discount percentage captured from the game.
    pub discount: u8,
}

impl OrderLine {
    /// Creates a new line holding one unit of a game.
    pub fn first_unit(order_id: OrderId, game: &Game) -> Self {
        Self {
            id: LineId::new(),
            order_id,
            game_id: game.id,
            price: game.price,
            quantity: 1,
            discount: game.discount,
        }
    }

    /// Returns the line total after discount.
    pub fn total(&self) -> Money {
        self.price.multiply(self.quantity).with_discount(self.discount)
    }
}
