//! Order line management: the cart-mutation API.

use std::sync::Arc;

use common::{CustomerId, GameId, LineId};
use store::{GameRepository, LineRepository, OrderLine, OrderRepository, StoreError};

use crate::cart::CartResolver;
use crate::error::OrderError;
use crate::ledger::InventoryLedger;

/// Adds, merges, updates and removes order lines, coordinating each line
/// write with a matching stock delta through the [`InventoryLedger`].
///
/// Every successful mutation conserves units: `unit_in_stock` and the
/// quantities held by open cart lines are complementary views of the same
/// finite pool. A mutation that cannot complete both halves leaves
/// neither committed.
pub struct LineManager<S> {
    store: Arc<S>,
    carts: CartResolver<S>,
    ledger: InventoryLedger<S>,
}

impl<S> Clone for LineManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            carts: self.carts.clone(),
            ledger: self.ledger.clone(),
        }
    }
}

impl<S: GameRepository + OrderRepository + LineRepository> LineManager<S> {
    /// Creates a line manager over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            carts: CartResolver::new(store.clone()),
            ledger: InventoryLedger::new(store.clone()),
            store,
        }
    }

    /// Returns the cart resolver this manager coordinates with.
    pub fn carts(&self) -> &CartResolver<S> {
        &self.carts
    }

    /// Adds one unit of a game to the customer's cart.
    ///
    /// Re-adding a game the cart already holds merges into the existing
    /// line; `(order_id, game_id)` stays unique. The increment is
    /// rejected exactly when the ledger cannot supply one more unit at
    /// this instant, so the availability gate and the stock decrement are
    /// the same atomic operation. The line write is a single upsert;
    /// unit price and discount are re-snapshotted whenever the line
    /// changes.
    #[tracing::instrument(skip(self))]
    pub async fn add_game_to_cart(
        &self,
        customer_id: CustomerId,
        game_id: GameId,
    ) -> Result<OrderLine, OrderError> {
        let game = self
            .store
            .game(game_id)
            .await?
            .ok_or_else(|| OrderError::GameNotFound(game_id.to_string()))?;
        InventoryLedger::<S>::check_available(&game)?;

        let cart = self.carts.get_or_create(customer_id).await?;
        if !cart.status.can_modify_items() {
            return Err(OrderError::OrderNotOpen(cart.id));
        }

        self.ledger.reserve(game_id, 1).await?;
        let line = match self
            .store
            .upsert_line(OrderLine::first_unit(cart.id, &game))
            .await
        {
            Ok(line) => line,
            Err(e) => {
                self.ledger.release(game_id, 1).await?;
                return Err(e.into());
            }
        };

        metrics::counter!("cart_adds_total").increment(1);
        tracing::debug!(%customer_id, %game_id, quantity = line.quantity, "added game to cart");
        Ok(line)
    }

    /// Removes a game from the customer's cart by key, returning the
    /// line's reserved units to available stock.
    #[tracing::instrument(skip(self))]
    pub async fn remove_game_from_cart(
        &self,
        customer_id: CustomerId,
        game_key: &str,
    ) -> Result<(), OrderError> {
        let game = self
            .store
            .game_by_key(game_key)
            .await?
            .ok_or_else(|| OrderError::GameNotFound(game_key.to_string()))?;

        let cart = self
            .store
            .find_open_order(customer_id)
            .await?
            .ok_or_else(|| OrderError::LineNotFound(format!("for game '{game_key}'")))?;

        let line = self
            .store
            .find_line(cart.id, game.id)
            .await?
            .ok_or_else(|| OrderError::LineNotFound(format!("for game '{game_key}'")))?;

        self.store.delete_line(line.id).await?;
        self.ledger.release(game.id, line.quantity).await?;

        metrics::counter!("cart_removes_total").increment(1);
        tracing::debug!(%customer_id, %game_key, released = line.quantity, "removed game from cart");
        Ok(())
    }

    /// Sets a line to an explicit quantity, reserving or releasing the
    /// signed difference.
    ///
    /// Used by order-editing flows; a delta the ledger cannot cover fails
    /// with [`OrderError::InsufficientStock`] and changes nothing. The
    /// write is guarded by the quantity read here, so a concurrent edit
    /// of the same line fails with [`OrderError::ConcurrentEdit`] and
    /// rolls its stock delta back rather than losing an update.
    #[tracing::instrument(skip(self))]
    pub async fn update_line_quantity(
        &self,
        line_id: LineId,
        new_count: u32,
    ) -> Result<OrderLine, OrderError> {
        if new_count < 1 {
            return Err(OrderError::InvalidQuantity(new_count));
        }

        let line = self
            .store
            .line(line_id)
            .await?
            .ok_or_else(|| OrderError::line_not_found(line_id))?;
        self.ensure_order_open(&line).await?;

        let old_count = line.quantity;
        let delta = i64::from(new_count) - i64::from(old_count);
        if delta == 0 {
            return Ok(line);
        }

        if delta > 0 {
            self.ledger.reserve(line.game_id, delta as u32).await?;
        } else {
            self.ledger.release(line.game_id, (-delta) as u32).await?;
        }

        match self.store.set_quantity(line_id, old_count, new_count).await {
            Ok(line) => {
                tracing::debug!(%line_id, old_count, new_count, "updated line quantity");
                Ok(line)
            }
            Err(e) => {
                // Roll the stock delta back so the two halves stay one
                // logical transaction.
                if delta > 0 {
                    self.ledger.release(line.game_id, delta as u32).await?;
                } else {
                    self.ledger.reserve(line.game_id, (-delta) as u32).await?;
                }
                Err(match e {
                    StoreError::ConcurrencyConflict { .. } => OrderError::ConcurrentEdit(line_id),
                    StoreError::NotFound(_) => OrderError::line_not_found(line_id),
                    other => other.into(),
                })
            }
        }
    }

    /// Deletes a line by id; the administrative counterpart of
    /// [`remove_game_from_cart`](Self::remove_game_from_cart).
    #[tracing::instrument(skip(self))]
    pub async fn delete_line(&self, line_id: LineId) -> Result<(), OrderError> {
        let line = self
            .store
            .line(line_id)
            .await?
            .ok_or_else(|| OrderError::line_not_found(line_id))?;
        self.ensure_order_open(&line).await?;

        self.store.delete_line(line.id).await?;
        self.ledger.release(line.game_id, line.quantity).await?;

        tracing::debug!(%line_id, released = line.quantity, "deleted line");
        Ok(())
    }

    async fn ensure_order_open(&self, line: &OrderLine) -> Result<(), OrderError> {
        let order = self
            .store
            .order(line.order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(line.order_id))?;
        if !order.status.can_modify_items() {
            return Err(OrderError::OrderNotOpen(order.id));
        }
        Ok(())
    }
}
