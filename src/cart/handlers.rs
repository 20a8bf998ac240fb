//! REST handlers for cart operations
//!
//! Thin layer over the mutation coordinator: resolve the shopper session,
//! run the operation, return the authoritative snapshot. New sessions are
//! echoed back via the session header.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;

use super::coordinator::{self, CartOp};
use super::models::{AddItemRequest, CartView, UpdateQuantityRequest};
use crate::error::EngineError;
use crate::session::{attach_session_header, resolve_session_id};
use crate::state::SharedState;

/// Creates routes for cart operations.
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/add", post(add_item))
        .route("/cart/items/:product_id", put(update_quantity))
        .route("/cart/items/:product_id", delete(remove_item))
        .route("/cart/clear", delete(clear_cart))
        .route("/cart/validate", get(validate_cart))
        .route("/cart/count", get(cart_count))
}

/// Endpoint: GET /cart
/// A shopper without a cart gets an empty snapshot, not an error.
async fn get_cart(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let (session_id, is_new) = resolve_session_id(&headers);

    let view = match state.carts.get(&session_id) {
        Some(cart) => CartView::from_cart(&session_id, &cart),
        None => CartView::empty(&session_id),
    };

    respond(Json(view).into_response(), &session_id, is_new)
}

/// Endpoint: POST /cart/add
async fn add_item(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<AddItemRequest>,
) -> Result<Response, EngineError> {
    let (session_id, is_new) = resolve_session_id(&headers);
    let view = coordinator::mutate(
        &state,
        &session_id,
        CartOp::Add {
            product_id: payload.product_id,
            quantity: payload.quantity,
        },
    )
    .await?;

    Ok(respond(Json(view).into_response(), &session_id, is_new))
}

/// Endpoint: PUT /cart/items/:product_id
async fn update_quantity(
    State(state): State<SharedState>,
    Path(product_id): Path<u64>,
    headers: HeaderMap,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<Response, EngineError> {
    let (session_id, is_new) = resolve_session_id(&headers);
    let view = coordinator::mutate(
        &state,
        &session_id,
        CartOp::SetQuantity {
            product_id,
            quantity: payload.quantity,
        },
    )
    .await?;

    Ok(respond(Json(view).into_response(), &session_id, is_new))
}

/// Endpoint: DELETE /cart/items/:product_id
async fn remove_item(
    State(state): State<SharedState>,
    Path(product_id): Path<u64>,
    headers: HeaderMap,
) -> Result<Response, EngineError> {
    let (session_id, is_new) = resolve_session_id(&headers);
    let view = coordinator::mutate(&state, &session_id, CartOp::Remove { product_id }).await?;

    Ok(respond(Json(view).into_response(), &session_id, is_new))
}

/// Endpoint: DELETE /cart/clear
async fn clear_cart(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Response, EngineError> {
    let (session_id, is_new) = resolve_session_id(&headers);
    coordinator::mutate(&state, &session_id, CartOp::Clear).await?;

    Ok(respond(
        Json(json!({ "message": "cart cleared" })).into_response(),
        &session_id,
        is_new,
    ))
}

/// Endpoint: GET /cart/validate
/// Revalidates the cart against the catalog; used before final submission
/// to catch stock and price drift.
async fn validate_cart(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Response, EngineError> {
    let (session_id, is_new) = resolve_session_id(&headers);
    let result = coordinator::validate(&state, &session_id).await?;

    Ok(respond(Json(result).into_response(), &session_id, is_new))
}

/// Endpoint: GET /cart/count
async fn cart_count(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let (session_id, is_new) = resolve_session_id(&headers);
    let count = state
        .carts
        .get(&session_id)
        .map(|c| c.totals().total_items)
        .unwrap_or(0);

    respond(
        Json(json!({ "count": count })).into_response(),
        &session_id,
        is_new,
    )
}

fn respond(mut response: Response, session_id: &str, is_new: bool) -> Response {
    if is_new {
        attach_session_header(&mut response, session_id);
    }
    response
}
