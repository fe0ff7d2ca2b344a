//! Repository traits the domain services are written against.
//!
//! One backend type implements all three traits, so method names carry
//! the entity name to keep call sites unambiguous.

use async_trait::async_trait;
use common::{CustomerId, GameId, LineId, OrderId};

use crate::error::Result;
use crate::model::{Game, Order, OrderLine};

/// Read/write access to catalog rows, including the stock counter.
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Loads a game by id. Returns None if absent.
    async fn game(&self, id: GameId) -> Result<Option<Game>>;

    /// Loads a game by its unique key (slug). Returns None if absent.
    async fn game_by_key(&self, key: &str) -> Result<Option<Game>>;

    /// Inserts a catalog row; used by seeding and tests.
    async fn insert_game(&self, game: Game) -> Result<()>;

    /// Atomically applies a signed delta to `unit_in_stock` and returns
    /// the updated row.
    ///
    /// This is the read-check-write primitive that keeps the counter
    /// non-negative under concurrent adds: the check and the write happen
    /// under one row lock (Postgres) or one write lock (memory). A delta
    /// that would cross zero fails with
    /// [`crate::StoreError::InsufficientStock`] and leaves the row
    /// untouched.
    async fn adjust_stock(&self, id: GameId, delta: i64) -> Result<Game>;
}

/// Access to order rows.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Loads an order by id. Returns None if absent.
    async fn order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists all orders.
    async fn orders(&self) -> Result<Vec<Order>>;

    /// Finds the customer's Open order, if any. At most one exists.
    async fn find_open_order(&self, customer_id: CustomerId) -> Result<Option<Order>>;

    /// Inserts a new Open order for a customer.
    ///
    /// Fails with [`crate::StoreError::OpenCartExists`] when the customer
    /// already has one; the uniqueness guard lives at the storage
    /// boundary so concurrent first-time adds cannot race into two carts.
    async fn insert_open_order(&self, order: Order) -> Result<()>;

    /// Atomically transitions an Open order to Shipped, stamping `date`.
    ///
    /// Fails with [`crate::StoreError::NotFound`] when the row is absent
    /// and [`crate::StoreError::NotOpen`] when it has already left the
    /// Open state.
    async fn set_shipped(
        &self,
        id: OrderId,
        date: chrono::DateTime<chrono::Utc>,
    ) -> Result<Order>;
}

/// Access to order line rows.
#[async_trait]
pub trait LineRepository: Send + Sync {
    /// Loads a line by id. Returns None if absent.
    async fn line(&self, id: LineId) -> Result<Option<OrderLine>>;

    /// Finds the line for `(order_id, game_id)`, if any.
    async fn find_line(&self, order_id: OrderId, game_id: GameId) -> Result<Option<OrderLine>>;

    /// Lists all lines belonging to an order.
    async fn lines_for_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>>;

    /// Inserts a new line.
    async fn insert_line(&self, line: OrderLine) -> Result<()>;

    /// Inserts `line`, or merges it into the existing row for
    /// `(order_id, game_id)`: quantities are summed and `price` and
    /// `discount` are re-snapshotted from `line`. Returns the stored row.
    ///
    /// Insert-or-merge is one statement (Postgres upsert, one write lock
    /// in memory), so concurrent adds of the same game cannot lose an
    /// increment the way a find-then-update sequence can.
    async fn upsert_line(&self, line: OrderLine) -> Result<OrderLine>;

    /// Atomically sets a line's quantity, guarded by the quantity the
    /// caller read.
    ///
    /// Fails with [`crate::StoreError::ConcurrencyConflict`] when the
    /// stored quantity no longer matches `expected`, and
    /// [`crate::StoreError::NotFound`] when the row is absent.
    async fn set_quantity(&self, id: LineId, expected: u32, quantity: u32) -> Result<OrderLine>;

    /// Deletes a line by id.
    async fn delete_line(&self, id: LineId) -> Result<()>;
}
