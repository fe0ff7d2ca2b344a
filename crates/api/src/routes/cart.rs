//! Cart mutation and payment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::{CustomerId, GameId, LineId};
use domain::{
    LineManager, OrderLifecycle, PaymentGateway, PaymentOutcome, PaymentRequest,
};
use serde::{Deserialize, Serialize};
use store::{GameRepository, LineRepository, OrderLine, OrderRepository};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S, P> {
    pub lines: LineManager<S>,
    pub lifecycle: OrderLifecycle<S, P>,
}

/// Bounds every handler needs from the store and gateway types.
pub trait StoreBound:
    GameRepository + OrderRepository + LineRepository + Send + Sync + 'static
{
}
impl<T: GameRepository + OrderRepository + LineRepository + Send + Sync + 'static> StoreBound
    for T
{
}

// -- Request types --

#[derive(Deserialize)]
pub struct PayRequest {
    pub method: String,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub count: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct LineResponse {
    pub id: String,
    pub order_id: String,
    pub game_id: String,
    pub price_cents: i64,
    pub quantity: u32,
    pub discount: u8,
}

impl From<OrderLine> for LineResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            id: line.id.to_string(),
            order_id: line.order_id.to_string(),
            game_id: line.game_id.to_string(),
            price_cents: line.price.cents(),
            quantity: line.quantity,
            discount: line.discount,
        }
    }
}

// -- Handlers --

/// GET /cart/{customer_id} — the customer's cart lines; empty when no
/// cart exists yet.
#[tracing::instrument(skip(state))]
pub async fn get<S: StoreBound, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<LineResponse>>, ApiError> {
    let customer_id = parse_customer_id(&customer_id)?;
    let lines = state.lines.carts().lines(customer_id).await?;
    Ok(Json(lines.into_iter().map(LineResponse::from).collect()))
}

/// POST /cart/{customer_id}/games/{game_id} — add one unit to the cart.
#[tracing::instrument(skip(state))]
pub async fn add_game<S: StoreBound, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
    Path((customer_id, game_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<LineResponse>), ApiError> {
    let customer_id = parse_customer_id(&customer_id)?;
    let game_id = parse_game_id(&game_id)?;

    let line = state.lines.add_game_to_cart(customer_id, game_id).await?;
    Ok((StatusCode::CREATED, Json(line.into())))
}

/// DELETE /cart/{customer_id}/games/{game_key} — remove a game by key.
#[tracing::instrument(skip(state))]
pub async fn remove_game<S: StoreBound, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
    Path((customer_id, game_key)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let customer_id = parse_customer_id(&customer_id)?;
    state
        .lines
        .remove_game_from_cart(customer_id, &game_key)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /cart/{customer_id}/pay — charge the open cart.
///
/// A confirmation outcome is returned as JSON; an invoice outcome is
/// streamed back with its own content type.
#[tracing::instrument(skip(state, req))]
pub async fn pay<S: StoreBound, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(customer_id): Path<String>,
    Json(req): Json<PayRequest>,
) -> Result<Response, ApiError> {
    let customer_id = parse_customer_id(&customer_id)?;

    let outcome = state
        .lifecycle
        .process_payment(PaymentRequest {
            customer_id,
            method: req.method,
        })
        .await?;

    Ok(match outcome {
        PaymentOutcome::Confirmation(confirmation) => Json(confirmation).into_response(),
        PaymentOutcome::Invoice {
            content_type,
            bytes,
        } => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, content_type)],
            bytes,
        )
            .into_response(),
    })
}

/// PATCH /lines/{line_id} — set a line to an explicit quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update_line<S: StoreBound, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(line_id): Path<String>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<LineResponse>, ApiError> {
    let line_id = parse_line_id(&line_id)?;
    let line = state.lines.update_line_quantity(line_id, req.count).await?;
    Ok(Json(line.into()))
}

/// DELETE /lines/{line_id} — administrative line removal.
#[tracing::instrument(skip(state))]
pub async fn delete_line<S: StoreBound, P: PaymentGateway + 'static>(
    State(state): State<Arc<AppState<S, P>>>,
    Path(line_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let line_id = parse_line_id(&line_id)?;
    state.lines.delete_line(line_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_customer_id(id: &str) -> Result<CustomerId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid customer id: {e}")))?;
    Ok(CustomerId::from(uuid))
}

fn parse_game_id(id: &str) -> Result<GameId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid game id: {e}")))?;
    Ok(GameId::from(uuid))
}

fn parse_line_id(id: &str) -> Result<LineId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid line id: {e}")))?;
    Ok(LineId::from(uuid))
}
