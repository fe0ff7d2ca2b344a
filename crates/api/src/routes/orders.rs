//! Order read and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use domain::{PaymentGateway, PaymentMethod};
use serde::Serialize;
use store::Order;

use crate::error::ApiError;
use crate::routes::cart::{AppState, LineResponse, StoreBound};

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub status: String,
    pub date: Option<String>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id.to_string(),
            customer_id: order.customer_id.to_string(),
            status: order.status.to_string(),
            date: order.date.map(|d| d.to_rfc3339()),
        }
    }
}

#[derive(Serialize)]
pub struct OrderDetailsResponse {
    pub order: OrderResponse,
    pub lines: Vec<LineResponse>,
    pub total_cents: i64,
}

// -- Handlers --

/// GET /orders — list all orders.
#[tracing::instrument(skip(state))]
pub async fn list<S: StoreBound, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.lifecycle.orders().await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// GET /orders/{id} — load one order.
#[tracing::instrument(skip(state))]
pub async fn get<S: StoreBound, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_order_id(&id)?;
    let order = state.lifecycle.order(id).await?;
    Ok(Json(order.into()))
}

/// GET /orders/{id}/details — order with lines and total.
#[tracing::instrument(skip(state))]
pub async fn details<S: StoreBound, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetailsResponse>, ApiError> {
    let id = parse_order_id(&id)?;
    let details = state.lifecycle.order_details(id).await?;

    Ok(Json(OrderDetailsResponse {
        order: details.order.into(),
        lines: details.lines.into_iter().map(LineResponse::from).collect(),
        total_cents: details.total.cents(),
    }))
}

/// POST /orders/{id}/ship — transition an Open order to Shipped.
#[tracing::instrument(skip(state))]
pub async fn ship<S: StoreBound, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_order_id(&id)?;
    let shipped = state.lifecycle.ship_order(id).await?;
    Ok(Json(shipped.into()))
}

/// GET /payment-methods — the configured payment-method catalog.
#[tracing::instrument(skip(state))]
pub async fn payment_methods<S: StoreBound, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
) -> Result<Json<Vec<PaymentMethod>>, ApiError> {
    Ok(Json(state.lifecycle.payment_methods().to_vec()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;
    Ok(OrderId::from(uuid))
}
