//! Domain services for the game store back office.
//!
//! Four components own the cart / order line / stock ledger core:
//!
//! - [`InventoryLedger`] — sole authority over the `unit_in_stock` counter
//! - [`CartResolver`] — maps a customer to exactly one Open order
//! - [`LineManager`] — cart mutations: add, merge, update, remove lines
//! - [`OrderLifecycle`] — order reads, payment, and the Open→Shipped
//!   transition
//!
//! All services are generic over the store type so tests run against
//! `store::MemoryStore` and production against `store::PostgresStore`.

pub mod cart;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod lines;
pub mod payment;

pub use cart::CartResolver;
pub use error::OrderError;
pub use ledger::InventoryLedger;
pub use lifecycle::{OrderDetails, OrderLifecycle, PaymentMethod, PaymentRequest};
pub use lines::LineManager;
pub use payment::{
    ChargeRequest, HttpPaymentGateway, MockPaymentGateway, PaymentConfirmation, PaymentError,
    PaymentGateway, PaymentOutcome,
};
