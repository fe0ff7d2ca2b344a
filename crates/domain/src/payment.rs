//! Payment collaborator: trait, mock and HTTP implementations.
//!
//! The collaborator is a black box to this core: it is handed a charge
//! request and returns either a structured confirmation or a downloadable
//! invoice document. Failures are surfaced to the caller with context; no
//! automatic retry is attempted.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the payment collaborator.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The provider rejected the charge.
    #[error("Payment rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached or timed out.
    #[error("Payment provider unreachable: {0}")]
    Transport(String),

    /// The provider's response could not be decoded.
    #[error("Malformed payment response: {0}")]
    Malformed(String),
}

/// A charge handed to the payment collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// The order being paid for.
    pub order_id: OrderId,

    /// The paying customer.
    pub customer_id: CustomerId,

    /// Selected payment method id.
    pub method: String,

    /// Total amount to charge.
    pub amount: Money,
}

/// Structured confirmation of a successful charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    /// Provider-assigned payment id.
    pub payment_id: String,

    /// The order that was paid.
    pub order_id: OrderId,

    /// Amount charged.
    pub amount: Money,

    /// When the charge was confirmed.
    pub paid_at: DateTime<Utc>,
}

/// What a successful charge produces.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    /// A structured confirmation object.
    Confirmation(PaymentConfirmation),

    /// A downloadable artifact, e.g. a bank invoice.
    Invoice {
        /// MIME type of the document.
        content_type: String,
        /// Raw document bytes.
        bytes: Vec<u8>,
    },
}

/// Trait for the outbound payment collaborator.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges a customer for an order.
    async fn charge(&self, request: ChargeRequest) -> Result<PaymentOutcome, PaymentError>;
}

#[derive(Debug, Default)]
struct MockGatewayState {
    payments: HashMap<String, ChargeRequest>,
    next_id: u32,
    fail_on_charge: bool,
}

/// In-memory payment gateway for testing.
///
/// The `bank` method yields an invoice document; every other method
/// yields a confirmation with a sequential `PAY-NNNN` id.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentGateway {
    state: Arc<RwLock<MockGatewayState>>,
}

impl MockPaymentGateway {
    /// Creates a new mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail on the next charge call.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state.write().unwrap().fail_on_charge = fail;
    }

    /// Returns the number of captured charges.
    pub fn payment_count(&self) -> usize {
        self.state.read().unwrap().payments.len()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(&self, request: ChargeRequest) -> Result<PaymentOutcome, PaymentError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_charge {
            return Err(PaymentError::Rejected("Payment declined".to_string()));
        }

        state.next_id += 1;
        let payment_id = format!("PAY-{:04}", state.next_id);
        state.payments.insert(payment_id.clone(), request.clone());

        if request.method == "bank" {
            let invoice = serde_json::json!({
                "invoice_for": request.order_id,
                "customer": request.customer_id,
                "amount_cents": request.amount.cents(),
                "payment_id": payment_id,
            });
            let bytes = serde_json::to_vec(&invoice)
                .map_err(|e| PaymentError::Malformed(e.to_string()))?;
            return Ok(PaymentOutcome::Invoice {
                content_type: "application/json".to_string(),
                bytes,
            });
        }

        Ok(PaymentOutcome::Confirmation(PaymentConfirmation {
            payment_id,
            order_id: request.order_id,
            amount: request.amount,
            paid_at: Utc::now(),
        }))
    }
}

/// HTTP-backed payment gateway.
///
/// Posts the charge request as JSON to `{base_url}/payments` and expects
/// a [`PaymentConfirmation`] back. Timeouts and connection failures
/// surface as [`PaymentError::Transport`]; non-success statuses as
/// [`PaymentError::Rejected`].
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentGateway {
    /// Creates a gateway against the given provider base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn charge(&self, request: ChargeRequest) -> Result<PaymentOutcome, PaymentError> {
        let url = format!("{}/payments", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Rejected(format!("{status}: {body}")));
        }

        let confirmation: PaymentConfirmation = response
            .json()
            .await
            .map_err(|e| PaymentError::Malformed(e.to_string()))?;

        Ok(PaymentOutcome::Confirmation(confirmation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: &str) -> ChargeRequest {
        ChargeRequest {
            order_id: OrderId::new(),
            customer_id: CustomerId::new(),
            method: method.to_string(),
            amount: Money::from_cents(5998),
        }
    }

    #[tokio::test]
    async fn charge_returns_sequential_confirmations() {
        let gateway = MockPaymentGateway::new();

        let a = gateway.charge(request("visa")).await.unwrap();
        let b = gateway.charge(request("visa")).await.unwrap();

        match (a, b) {
            (PaymentOutcome::Confirmation(a), PaymentOutcome::Confirmation(b)) => {
                assert_eq!(a.payment_id, "PAY-0001");
                assert_eq!(b.payment_id, "PAY-0002");
            }
            _ => panic!("expected confirmations"),
        }
        assert_eq!(gateway.payment_count(), 2);
    }

    #[tokio::test]
    async fn bank_method_yields_an_invoice_document() {
        let gateway = MockPaymentGateway::new();

        let outcome = gateway.charge(request("bank")).await.unwrap();
        match outcome {
            PaymentOutcome::Invoice { content_type, bytes } => {
                assert_eq!(content_type, "application/json");
                let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
                assert_eq!(doc["amount_cents"], 5998);
            }
            PaymentOutcome::Confirmation(_) => panic!("expected invoice"),
        }
    }

    #[tokio::test]
    async fn fail_on_charge_rejects() {
        let gateway = MockPaymentGateway::new();
        gateway.set_fail_on_charge(true);

        let err = gateway.charge(request("visa")).await.unwrap_err();
        assert!(matches!(err, PaymentError::Rejected(_)));
        assert_eq!(gateway.payment_count(), 0);
    }
}
