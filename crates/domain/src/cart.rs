//! Cart resolution: one mutable Open order per customer.

use std::sync::Arc;

use common::CustomerId;
use store::{LineRepository, Order, OrderLine, OrderRepository, StoreError};

use crate::error::OrderError;

/// Maps a customer identity to exactly one Open order; that order is the
/// customer's cart.
pub struct CartResolver<S> {
    store: Arc<S>,
}

impl<S> Clone for CartResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: OrderRepository + LineRepository> CartResolver<S> {
    /// Creates a resolver over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Finds the customer's Open order, creating one lazily on first use.
    ///
    /// Idempotent: a lost insert race (another request created the cart
    /// between our read and write) is recovered by re-reading the
    /// winner's row.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create(&self, customer_id: CustomerId) -> Result<Order, OrderError> {
        if let Some(order) = self.store.find_open_order(customer_id).await? {
            return Ok(order);
        }

        let order = Order::open(customer_id);
        match self.store.insert_open_order(order.clone()).await {
            Ok(()) => {
                tracing::debug!(%customer_id, order_id = %order.id, "created cart");
                Ok(order)
            }
            Err(StoreError::OpenCartExists(_)) => self
                .store
                .find_open_order(customer_id)
                .await?
                .ok_or(OrderError::Storage(StoreError::OpenCartExists(customer_id))),
            Err(e) => Err(e.into()),
        }
    }

    /// Read-only cart view for display endpoints.
    ///
    /// Returns an empty line list rather than failing when the customer
    /// has no cart yet.
    #[tracing::instrument(skip(self))]
    pub async fn lines(&self, customer_id: CustomerId) -> Result<Vec<OrderLine>, OrderError> {
        match self.store.find_open_order(customer_id).await? {
            Some(order) => Ok(self.store.lines_for_order(order.id).await?),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use common::Money;
    use store::{Game, GameRepository, MemoryStore, OrderStatus};

    use super::*;

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let carts = CartResolver::new(store.clone());
        let customer_id = CustomerId::new();

        let first = carts.get_or_create(customer_id).await.unwrap();
        let second = carts.get_or_create(customer_id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.status, OrderStatus::Open);
        assert_eq!(store.open_order_count(customer_id).await, 1);
    }

    #[tokio::test]
    async fn concurrent_first_adds_share_one_cart() {
        let store = Arc::new(MemoryStore::new());
        let carts = CartResolver::new(store.clone());
        let customer_id = CustomerId::new();

        let (a, b) = tokio::join!(
            carts.get_or_create(customer_id),
            carts.get_or_create(customer_id)
        );

        assert_eq!(a.unwrap().id, b.unwrap().id);
        assert_eq!(store.open_order_count(customer_id).await, 1);
    }

    #[tokio::test]
    async fn customers_get_distinct_carts() {
        let store = Arc::new(MemoryStore::new());
        let carts = CartResolver::new(store);

        let a = carts.get_or_create(CustomerId::new()).await.unwrap();
        let b = carts.get_or_create(CustomerId::new()).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn lines_is_empty_without_a_cart() {
        let store = Arc::new(MemoryStore::new());
        let carts = CartResolver::new(store);

        let lines = carts.lines(CustomerId::new()).await.unwrap();
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn lines_returns_cart_contents() {
        let store = Arc::new(MemoryStore::new());
        let carts = CartResolver::new(store.clone());
        let customer_id = CustomerId::new();

        let game = Game::new("celeste", "Celeste", Money::from_cents(1999), 4);
        store.insert_game(game.clone()).await.unwrap();

        let cart = carts.get_or_create(customer_id).await.unwrap();
        store
            .insert_line(OrderLine::first_unit(cart.id, &game))
            .await
            .unwrap();

        let lines = carts.lines(customer_id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].game_id, game.id);
    }
}
