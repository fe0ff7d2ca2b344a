//! Shared types for the game store back office.

mod types;

pub use types::{CustomerId, GameId, LineId, Money, OrderId};
