use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, GameId, LineId, OrderId};
use tokio::sync::RwLock;

use crate::{
    Game, GameRepository, LineRepository, Order, OrderLine, OrderRepository, OrderStatus, Result,
    StoreError,
};

#[derive(Default)]
struct Tables {
    games: HashMap<GameId, Game>,
    orders: HashMap<OrderId, Order>,
    lines: HashMap<LineId, OrderLine>,
}

/// In-memory store implementation for testing.
///
/// All three repositories share one set of tables behind a single
/// `RwLock`, so the check-then-write sequences in `adjust_stock`,
/// `insert_open_order` and `set_shipped` observe the same atomicity the
/// PostgreSQL implementation gets from row locks and constraints.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of order lines stored.
    pub async fn line_count(&self) -> usize {
        self.tables.read().await.lines.len()
    }

    /// Returns the number of Open orders for a customer.
    pub async fn open_order_count(&self, customer_id: CustomerId) -> usize {
        self.tables
            .read()
            .await
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id && o.status == OrderStatus::Open)
            .count()
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        tables.games.clear();
        tables.orders.clear();
        tables.lines.clear();
    }
}

#[async_trait]
impl GameRepository for MemoryStore {
    async fn game(&self, id: GameId) -> Result<Option<Game>> {
        Ok(self.tables.read().await.games.get(&id).cloned())
    }

    async fn game_by_key(&self, key: &str) -> Result<Option<Game>> {
        Ok(self
            .tables
            .read()
            .await
            .games
            .values()
            .find(|g| g.key == key)
            .cloned())
    }

    async fn insert_game(&self, game: Game) -> Result<()> {
        self.tables.write().await.games.insert(game.id, game);
        Ok(())
    }

    async fn adjust_stock(&self, id: GameId, delta: i64) -> Result<Game> {
        let mut tables = self.tables.write().await;
        let game = tables
            .games
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("game {id}")))?;

        let next = i64::from(game.unit_in_stock) + delta;
        if next < 0 {
            return Err(StoreError::InsufficientStock {
                game_id: id,
                requested: delta.unsigned_abs().try_into().unwrap_or(u32::MAX),
                available: game.unit_in_stock,
            });
        }

        game.unit_in_stock = u32::try_from(next).unwrap_or(u32::MAX);
        Ok(game.clone())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn orders(&self) -> Result<Vec<Order>> {
        Ok(self.tables.read().await.orders.values().cloned().collect())
    }

    async fn find_open_order(&self, customer_id: CustomerId) -> Result<Option<Order>> {
        Ok(self
            .tables
            .read()
            .await
            .orders
            .values()
            .find(|o| o.customer_id == customer_id && o.status == OrderStatus::Open)
            .cloned())
    }

    async fn insert_open_order(&self, order: Order) -> Result<()> {
        let mut tables = self.tables.write().await;

        // Unique constraint simulation: one Open order per customer.
        let duplicate = tables
            .orders
            .values()
            .any(|o| o.customer_id == order.customer_id && o.status == OrderStatus::Open);
        if duplicate {
            return Err(StoreError::OpenCartExists(order.customer_id));
        }

        tables.orders.insert(order.id, order);
        Ok(())
    }

    async fn set_shipped(&self, id: OrderId, date: DateTime<Utc>) -> Result<Order> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;

        if order.status != OrderStatus::Open {
            return Err(StoreError::NotOpen(id));
        }

        order.status = OrderStatus::Shipped;
        order.date = Some(date);
        Ok(order.clone())
    }
}

#[async_trait]
impl LineRepository for MemoryStore {
    async fn line(&self, id: LineId) -> Result<Option<OrderLine>> {
        Ok(self.tables.read().await.lines.get(&id).cloned())
    }

    async fn find_line(&self, order_id: OrderId, game_id: GameId) -> Result<Option<OrderLine>> {
        Ok(self
            .tables
            .read()
            .await
            .lines
            .values()
            .find(|l| l.order_id == order_id && l.game_id == game_id)
            .cloned())
    }

    async fn lines_for_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        Ok(self
            .tables
            .read()
            .await
            .lines
            .values()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn insert_line(&self, line: OrderLine) -> Result<()> {
        self.tables.write().await.lines.insert(line.id, line);
        Ok(())
    }

    async fn upsert_line(&self, line: OrderLine) -> Result<OrderLine> {
        let mut tables = self.tables.write().await;

        // Merge simulation for the (order_id, game_id) unique constraint:
        // the lookup and the write share one lock acquisition.
        let existing = tables
            .lines
            .values_mut()
            .find(|l| l.order_id == line.order_id && l.game_id == line.game_id);

        match existing {
            Some(stored) => {
                stored.quantity += line.quantity;
                stored.price = line.price;
                stored.discount = line.discount;
                Ok(stored.clone())
            }
            None => {
                tables.lines.insert(line.id, line.clone());
                Ok(line)
            }
        }
    }

    async fn set_quantity(&self, id: LineId, expected: u32, quantity: u32) -> Result<OrderLine> {
        let mut tables = self.tables.write().await;
        let line = tables
            .lines
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("line {id}")))?;

        if line.quantity != expected {
            return Err(StoreError::ConcurrencyConflict {
                line_id: id,
                expected,
                actual: line.quantity,
            });
        }

        line.quantity = quantity;
        Ok(line.clone())
    }

    async fn delete_line(&self, id: LineId) -> Result<()> {
        self.tables.write().await.lines.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::Money;

    use super::*;

    fn game_with_stock(stock: u32) -> Game {
        Game::new("elden-ring", "Elden Ring", Money::from_cents(5999), stock)
    }

    #[tokio::test]
    async fn adjust_stock_applies_signed_deltas() {
        let store = MemoryStore::new();
        let game = game_with_stock(5);
        let id = game.id;
        store.insert_game(game).await.unwrap();

        let updated = store.adjust_stock(id, -2).await.unwrap();
        assert_eq!(updated.unit_in_stock, 3);

        let updated = store.adjust_stock(id, 1).await.unwrap();
        assert_eq!(updated.unit_in_stock, 4);
    }

    #[tokio::test]
    async fn adjust_stock_refuses_crossing_zero() {
        let store = MemoryStore::new();
        let game = game_with_stock(1);
        let id = game.id;
        store.insert_game(game).await.unwrap();

        let err = store.adjust_stock(id, -2).await.unwrap_err();
        assert!(matches!(err, StoreError::InsufficientStock { available: 1, .. }));

        // Row untouched after the refusal.
        let game = store.game(id).await.unwrap().unwrap();
        assert_eq!(game.unit_in_stock, 1);
    }

    #[tokio::test]
    async fn adjust_stock_unknown_game_is_not_found() {
        let store = MemoryStore::new();
        let err = store.adjust_stock(GameId::new(), -1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_decrements_never_go_negative() {
        let store = MemoryStore::new();
        let game = game_with_stock(1);
        let id = game.id;
        store.insert_game(game).await.unwrap();

        let (a, b) = tokio::join!(store.adjust_stock(id, -1), store.adjust_stock(id, -1));
        assert!(a.is_ok() != b.is_ok());

        let game = store.game(id).await.unwrap().unwrap();
        assert_eq!(game.unit_in_stock, 0);
    }

    #[tokio::test]
    async fn insert_open_order_enforces_one_cart_per_customer() {
        let store = MemoryStore::new();
        let customer_id = CustomerId::new();

        store.insert_open_order(Order::open(customer_id)).await.unwrap();
        let err = store
            .insert_open_order(Order::open(customer_id))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::OpenCartExists(c) if c == customer_id));
        assert_eq!(store.open_order_count(customer_id).await, 1);
    }

    #[tokio::test]
    async fn shipped_order_frees_the_customer_for_a_new_cart() {
        let store = MemoryStore::new();
        let customer_id = CustomerId::new();
        let order = Order::open(customer_id);
        let order_id = order.id;
        store.insert_open_order(order).await.unwrap();

        store.set_shipped(order_id, Utc::now()).await.unwrap();
        store.insert_open_order(Order::open(customer_id)).await.unwrap();
        assert_eq!(store.open_order_count(customer_id).await, 1);
    }

    #[tokio::test]
    async fn set_shipped_is_a_compare_and_set() {
        let store = MemoryStore::new();
        let order = Order::open(CustomerId::new());
        let order_id = order.id;
        store.insert_open_order(order).await.unwrap();

        let shipped = store.set_shipped(order_id, Utc::now()).await.unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert!(shipped.date.is_some());

        let err = store.set_shipped(order_id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotOpen(id) if id == order_id));
    }

    #[tokio::test]
    async fn find_line_scopes_lines_to_one_order() {
        let store = MemoryStore::new();
        let game = game_with_stock(10);
        let game_id = game.id;

        let order_a = Order::open(CustomerId::new());
        let order_b = Order::open(CustomerId::new());
        let line = OrderLine::first_unit(order_a.id, &game);
        store.insert_line(line).await.unwrap();

        assert!(store.find_line(order_a.id, game_id).await.unwrap().is_some());
        assert!(store.find_line(order_b.id, game_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_inserts_when_no_line_exists() {
        let store = MemoryStore::new();
        let game = game_with_stock(5);
        let order_id = OrderId::new();

        let stored = store
            .upsert_line(OrderLine::first_unit(order_id, &game))
            .await
            .unwrap();

        assert_eq!(stored.quantity, 1);
        assert_eq!(store.line_count().await, 1);
    }

    #[tokio::test]
    async fn upsert_merges_quantities_and_resnapshots_price() {
        let store = MemoryStore::new();
        let mut game = game_with_stock(5);
        let order_id = OrderId::new();
        store
            .upsert_line(OrderLine::first_unit(order_id, &game))
            .await
            .unwrap();

        game.price = Money::from_cents(4999);
        let merged = store
            .upsert_line(OrderLine::first_unit(order_id, &game))
            .await
            .unwrap();

        assert_eq!(merged.quantity, 2);
        assert_eq!(merged.price, Money::from_cents(4999));
        assert_eq!(store.line_count().await, 1);
    }

    #[tokio::test]
    async fn concurrent_upserts_lose_no_increment() {
        let store = MemoryStore::new();
        let game = game_with_stock(10);
        let order_id = OrderId::new();

        let (a, b) = tokio::join!(
            store.upsert_line(OrderLine::first_unit(order_id, &game)),
            store.upsert_line(OrderLine::first_unit(order_id, &game))
        );
        a.unwrap();
        b.unwrap();

        let lines = store.lines_for_order(order_id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn set_quantity_is_guarded_by_the_read_value() {
        let store = MemoryStore::new();
        let game = game_with_stock(5);
        let line = OrderLine::first_unit(OrderId::new(), &game);
        store.insert_line(line.clone()).await.unwrap();

        let updated = store.set_quantity(line.id, 1, 3).await.unwrap();
        assert_eq!(updated.quantity, 3);

        // A writer holding the stale quantity loses.
        let err = store.set_quantity(line.id, 1, 5).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::ConcurrencyConflict {
                expected: 1,
                actual: 3,
                ..
            }
        ));
        assert_eq!(store.line(line.id).await.unwrap().unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn set_quantity_missing_line_is_not_found() {
        let store = MemoryStore::new();
        let err = store.set_quantity(LineId::new(), 1, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
