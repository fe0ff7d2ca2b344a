//! Persistence boundary for the game store back office.
//!
//! Owns the entity rows (`Game`, `Order`, `OrderLine`), the repository
//! traits the domain services are written against, and two backends:
//! an in-memory store for tests and a PostgreSQL store for production.
//!
//! The two invariants the storage layer is responsible for live here:
//! stock never goes negative (`GameRepository::adjust_stock` refuses a
//! delta that would cross zero) and a customer never ends up with two
//! Open orders (`OrderRepository::insert_open_order` refuses a duplicate).

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod repo;
pub mod status;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use model::{Game, Order, OrderLine};
pub use postgres::PostgresStore;
pub use repo::{GameRepository, LineRepository, OrderRepository};
pub use status::OrderStatus;
