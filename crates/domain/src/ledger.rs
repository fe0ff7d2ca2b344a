//! Inventory ledger: the sole authority over `unit_in_stock`.

use std::sync::Arc;

use common::GameId;
use store::{Game, GameRepository, StoreError};

use crate::error::OrderError;

/// Answers availability questions and applies stock deltas.
///
/// A unit of stock is either available (`unit_in_stock`) or held by an
/// open cart line; [`reserve`](Self::reserve) and
/// [`release`](Self::release) move units between the two sides. The
/// non-negativity check rides on the store's atomic `adjust_stock`, so a
/// violation fails loudly instead of clamping.
pub struct InventoryLedger<S> {
    store: Arc<S>,
}

impl<S> Clone for InventoryLedger<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: GameRepository> InventoryLedger<S> {
    /// Creates a ledger over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fails when the game cannot be added to a cart: soft-deleted or no
    /// units left.
    pub fn check_available(game: &Game) -> Result<(), OrderError> {
        if game.is_deleted || game.unit_in_stock == 0 {
            return Err(OrderError::Unavailable(game.key.clone()));
        }
        Ok(())
    }

    /// Moves `count` units from available stock to reserved.
    ///
    /// Fails with [`OrderError::InsufficientStock`] when the ledger
    /// cannot cover the count at this instant.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(&self, id: GameId, count: u32) -> Result<Game, OrderError> {
        self.adjust(id, -i64::from(count)).await
    }

    /// Returns `count` reserved units to available stock.
    #[tracing::instrument(skip(self))]
    pub async fn release(&self, id: GameId, count: u32) -> Result<Game, OrderError> {
        self.adjust(id, i64::from(count)).await
    }

    async fn adjust(&self, id: GameId, delta: i64) -> Result<Game, OrderError> {
        self.store.adjust_stock(id, delta).await.map_err(|e| match e {
            StoreError::InsufficientStock {
                game_id,
                requested,
                available,
            } => OrderError::InsufficientStock {
                game_id,
                requested,
                available,
            },
            StoreError::NotFound(_) => OrderError::GameNotFound(id.to_string()),
            other => OrderError::Storage(other),
        })
    }
}
