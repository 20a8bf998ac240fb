//! REST handlers for order tracking and lifecycle events
//!
//! The tracking endpoint is shopper-facing. The status endpoint is the feed
//! for externally-driven lifecycle events (fulfilment, carrier, returns);
//! the cancel endpoint is the one shopper-facing lifecycle action and is
//! limited to orders that have not started fulfilment.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::info;

use super::lifecycle::{self, OrderTrackingView};
use super::models::{Order, OrderStatus, StatusUpdateRequest};
use crate::error::EngineError;
use crate::state::SharedState;

/// Creates routes for order operations.
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/orders/track/:order_number", get(track_order))
        .route("/orders/:order_number/status", put(update_status))
        .route("/orders/:order_number/cancel", put(cancel_order))
}

/// Endpoint: GET /orders/track/:order_number
async fn track_order(
    State(state): State<SharedState>,
    Path(order_number): Path<String>,
) -> Result<Json<OrderTrackingView>, EngineError> {
    let order = state
        .orders
        .get(&order_number)
        .map(|o| o.clone())
        .ok_or(EngineError::OrderNotFound(order_number))?;

    Ok(Json(OrderTrackingView::from_order(order)))
}

/// Endpoint: PUT /orders/:order_number/status
/// Applies one externally-driven lifecycle event.
async fn update_status(
    State(state): State<SharedState>,
    Path(order_number): Path<String>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<Order>, EngineError> {
    let mut entry = state
        .orders
        .get_mut(&order_number)
        .ok_or(EngineError::OrderNotFound(order_number.clone()))?;

    lifecycle::apply_transition(&mut entry, payload.status)?;
    info!(order_number = %order_number, status = %payload.status, "order status updated");
    Ok(Json(entry.clone()))
}

/// Endpoint: PUT /orders/:order_number/cancel
/// Shopper-initiated cancellation, only before fulfilment begins.
async fn cancel_order(
    State(state): State<SharedState>,
    Path(order_number): Path<String>,
) -> Result<Json<Order>, EngineError> {
    let mut entry = state
        .orders
        .get_mut(&order_number)
        .ok_or(EngineError::OrderNotFound(order_number.clone()))?;

    if !matches!(entry.status, OrderStatus::Pending | OrderStatus::Confirmed) {
        return Err(EngineError::InvalidTransition {
            from: entry.status,
            to: OrderStatus::Cancelled,
        });
    }

    lifecycle::apply_transition(&mut entry, OrderStatus::Cancelled)?;
    info!(order_number = %order_number, "order cancelled by shopper");
    Ok(Json(entry.clone()))
}
