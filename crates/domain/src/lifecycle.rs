//! Order lifecycle: reads, payment, and the Open→Shipped transition.

use std::sync::Arc;

use chrono::Utc;
use common::{CustomerId, Money, OrderId};
use serde::{Deserialize, Serialize};
use store::{LineRepository, Order, OrderLine, OrderRepository, StoreError};

use crate::error::OrderError;
use crate::payment::{ChargeRequest, PaymentGateway, PaymentOutcome};

/// A supported payment method, as shown to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Stable method id referenced by payment requests.
    pub id: String,

    /// Display title.
    pub title: String,

    /// Short description.
    pub description: String,

    /// Image shown next to the method.
    pub image_url: String,
}

impl PaymentMethod {
    fn new(id: &str, title: &str, description: &str, image_url: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            image_url: image_url.to_string(),
        }
    }
}

/// A payment request for the caller's open cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// The paying customer; their open cart is the order being paid.
    pub customer_id: CustomerId,

    /// Selected payment method id.
    pub method: String,
}

/// An order with its lines and discounted total.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    /// The order row.
    pub order: Order,

    /// Its lines.
    pub lines: Vec<OrderLine>,

    /// Sum of line totals after discounts.
    pub total: Money,
}

/// Order-level read paths, payment, and the Open→Shipped transition.
///
/// Never touches the inventory ledger: stock was already committed when
/// the lines entered the cart.
pub struct OrderLifecycle<S, P> {
    store: Arc<S>,
    gateway: Arc<P>,
    methods: Vec<PaymentMethod>,
}

impl<S, P> Clone for OrderLifecycle<S, P> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
            methods: self.methods.clone(),
        }
    }
}

impl<S, P> OrderLifecycle<S, P>
where
    S: OrderRepository + LineRepository,
    P: PaymentGateway,
{
    /// Creates a lifecycle service with the default payment-method
    /// catalog.
    pub fn new(store: Arc<S>, gateway: Arc<P>) -> Self {
        Self {
            store,
            gateway,
            methods: Self::default_methods(),
        }
    }

    fn default_methods() -> Vec<PaymentMethod> {
        vec![
            PaymentMethod::new(
                "bank",
                "Bank",
                "Pay by bank transfer; an invoice document is generated",
                "/assets/payments/bank.png",
            ),
            PaymentMethod::new(
                "ibox",
                "IBox terminal",
                "Pay at any IBox terminal",
                "/assets/payments/ibox.png",
            ),
            PaymentMethod::new(
                "visa",
                "Visa",
                "Pay by Visa card",
                "/assets/payments/visa.png",
            ),
        ]
    }

    /// Lists all orders.
    #[tracing::instrument(skip(self))]
    pub async fn orders(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.orders().await?)
    }

    /// Loads an order by id.
    #[tracing::instrument(skip(self))]
    pub async fn order(&self, id: OrderId) -> Result<Order, OrderError> {
        self.store
            .order(id)
            .await?
            .ok_or(OrderError::OrderNotFound(id))
    }

    /// Loads an order together with its lines and discounted total.
    #[tracing::instrument(skip(self))]
    pub async fn order_details(&self, id: OrderId) -> Result<OrderDetails, OrderError> {
        let order = self.order(id).await?;
        let lines = self.store.lines_for_order(id).await?;
        let total = lines
            .iter()
            .fold(Money::zero(), |acc, line| acc + line.total());

        Ok(OrderDetails { order, lines, total })
    }

    /// Returns the configured payment-method catalog.
    pub fn payment_methods(&self) -> &[PaymentMethod] {
        &self.methods
    }

    /// Charges the customer's open cart through the payment collaborator.
    ///
    /// Collaborator failures are translated into
    /// [`OrderError::Payment`]; stock is untouched either way.
    #[tracing::instrument(skip(self))]
    pub async fn process_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentOutcome, OrderError> {
        if !self.methods.iter().any(|m| m.id == request.method) {
            return Err(OrderError::UnknownPaymentMethod(request.method));
        }

        let cart = self
            .store
            .find_open_order(request.customer_id)
            .await?
            .ok_or(OrderError::CartNotFound(request.customer_id))?;

        let details = self.order_details(cart.id).await?;
        if details.lines.is_empty() {
            return Err(OrderError::EmptyCart(cart.id));
        }

        let outcome = self
            .gateway
            .charge(ChargeRequest {
                order_id: cart.id,
                customer_id: request.customer_id,
                method: request.method,
                amount: details.total,
            })
            .await?;

        metrics::counter!("payments_processed_total").increment(1);
        tracing::info!(order_id = %cart.id, amount = %details.total, "payment processed");
        Ok(outcome)
    }

    /// Transitions an order from Open to Shipped.
    ///
    /// Shipping an already-shipped order is an invalid operation, not a
    /// no-op.
    #[tracing::instrument(skip(self))]
    pub async fn ship_order(&self, id: OrderId) -> Result<Order, OrderError> {
        let shipped = self
            .store
            .set_shipped(id, Utc::now())
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => OrderError::OrderNotFound(id),
                StoreError::NotOpen(_) => OrderError::AlreadyShipped(id),
                other => OrderError::Storage(other),
            })?;

        metrics::counter!("orders_shipped_total").increment(1);
        tracing::info!(order_id = %id, "order shipped");
        Ok(shipped)
    }
}
