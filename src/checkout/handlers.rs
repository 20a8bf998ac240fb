//! REST handlers for the checkout flow
//!
//! Each endpoint maps onto one orchestrator operation. The submit handler is
//! the only place where cart, checkout session and order store meet: it
//! validates the cart against the catalog, creates the order atomically and
//! tears down the session, reverting the session to the payment step when
//! anything fails.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tracing::info;

use super::models::{Address, BackRequest, CheckoutView, SubmitRequest};
use super::payment::{PaymentMethodSelection, PaymentRequest};
use super::session::CheckoutSession;
use crate::cart::coordinator;
use crate::error::EngineError;
use crate::order::models::Order;
use crate::session::{attach_session_header, resolve_session_id};
use crate::state::{AppState, SharedState};

/// Creates routes for checkout operations.
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/checkout", get(get_checkout))
        .route("/checkout", delete(cancel_checkout))
        .route("/checkout/shipping", post(submit_shipping))
        .route("/checkout/payment", post(submit_payment))
        .route("/checkout/back", post(go_back))
        .route("/checkout/submit", post(submit_order))
}

/// Endpoint: GET /checkout
/// A shopper who has not started checkout sees a fresh session view.
async fn get_checkout(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let (session_id, is_new) = resolve_session_id(&headers);
    let view = state
        .checkouts
        .get(&session_id)
        .map(|s| CheckoutView::from_session(&s))
        .unwrap_or_else(|| CheckoutView::from_session(&CheckoutSession::new()));

    respond(Json(view).into_response(), &session_id, is_new)
}

/// Endpoint: POST /checkout/shipping
/// Begins checkout if needed; requires a non-empty cart.
async fn submit_shipping(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(address): Json<Address>,
) -> Result<Response, EngineError> {
    let (session_id, is_new) = resolve_session_id(&headers);

    if state.carts.get(&session_id).map_or(true, |c| c.is_empty()) {
        return Err(EngineError::CheckoutStep(
            "cannot start checkout with an empty cart".into(),
        ));
    }

    let mut session = state.checkouts.entry(session_id.clone()).or_default();
    session.submit_shipping(address)?;
    let view = CheckoutView::from_session(&session);
    drop(session);

    Ok(respond(Json(view).into_response(), &session_id, is_new))
}

/// Endpoint: POST /checkout/payment
/// Validates the selected variant's fields; unselected variants are ignored
/// and their previously entered fields are discarded.
async fn submit_payment(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<PaymentRequest>,
) -> Result<Response, EngineError> {
    let (session_id, is_new) = resolve_session_id(&headers);

    let selection = PaymentMethodSelection::from_request(&payload)?;

    let mut session = active_session(&state, &session_id)?;
    session.submit_payment(selection)?;
    let view = CheckoutView::from_session(&session);
    drop(session);

    Ok(respond(Json(view).into_response(), &session_id, is_new))
}

/// Endpoint: POST /checkout/back
async fn go_back(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<BackRequest>,
) -> Result<Response, EngineError> {
    let (session_id, is_new) = resolve_session_id(&headers);

    let mut session = active_session(&state, &session_id)?;
    session.back(payload.step)?;
    let view = CheckoutView::from_session(&session);
    drop(session);

    Ok(respond(Json(view).into_response(), &session_id, is_new))
}

/// Endpoint: POST /checkout/submit
/// The review → success transition: one atomic order creation.
async fn submit_order(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Option<Json<SubmitRequest>>,
) -> Result<Response, EngineError> {
    let (session_id, is_new) = resolve_session_id(&headers);
    let notes = payload.and_then(|Json(p)| p.customer_notes);

    // Enter the processing pseudo-state and take what order creation needs,
    // without holding the session lock across the gateway calls.
    let (address, payment) = {
        let mut session = active_session(&state, &session_id)?;
        session.begin_submission()?;
        let address = session.shipping_address.clone();
        let payment = session.payment.clone();
        (address, payment)
    };

    match create_order(&state, &session_id, address, payment, notes).await {
        Ok(order) => {
            // Success ends the checkout: the session is discarded and the
            // cart is cleared.
            state.checkouts.remove(&session_id);
            state.carts.remove(&session_id);
            info!(
                order_number = %order.order_number,
                total = %order.total_amount,
                "order placed"
            );
            let order_number = order.order_number.clone();
            let response = Json(&order).into_response();
            state.orders.insert(order_number, order);
            Ok(respond(response, &session_id, is_new))
        }
        Err(e) => {
            if let Some(mut session) = state.checkouts.get_mut(&session_id) {
                session.fail_submission();
            }
            Err(e)
        }
    }
}

/// Endpoint: DELETE /checkout
/// Explicit cancellation discards the session; the cart is untouched.
async fn cancel_checkout(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let (session_id, is_new) = resolve_session_id(&headers);
    state.checkouts.remove(&session_id);

    respond(
        Json(json!({ "message": "checkout cancelled" })).into_response(),
        &session_id,
        is_new,
    )
}

async fn create_order(
    state: &AppState,
    session_id: &str,
    address: Option<Address>,
    payment: Option<PaymentMethodSelection>,
    notes: Option<String>,
) -> Result<Order, EngineError> {
    // begin_submission guarantees both are present; treat absence as an
    // orchestration bug, not a panic.
    let address = address
        .ok_or_else(|| EngineError::CheckoutStep("shipping address missing".into()))?;
    let payment = payment
        .ok_or_else(|| EngineError::CheckoutStep("payment method missing".into()))?;

    // Mandatory revalidation: catch stock and price drift between the
    // review step and submission.
    let validation = coordinator::validate(state, session_id).await?;
    if !validation.valid {
        let summary = validation
            .issues
            .first()
            .map(|i| format!("product {}: {}", i.product_id, i.issue))
            .unwrap_or_else(|| "cart validation failed".into());
        return Err(EngineError::StockConflict(summary));
    }

    let cart = state
        .carts
        .get(session_id)
        .map(|c| c.clone())
        .ok_or_else(|| EngineError::CheckoutStep("cart is empty".into()))?;
    if cart.is_empty() {
        return Err(EngineError::CheckoutStep("cart is empty".into()));
    }

    Ok(Order::create(&cart, &address, &payment, notes))
}

/// Looks up the shopper's active checkout session.
fn active_session<'a>(
    state: &'a AppState,
    session_id: &str,
) -> Result<dashmap::mapref::one::RefMut<'a, String, CheckoutSession>, EngineError> {
    state
        .checkouts
        .get_mut(session_id)
        .ok_or_else(|| EngineError::CheckoutStep("checkout has not started".into()))
}

fn respond(mut response: Response, session_id: &str, is_new: bool) -> Response {
    if is_new {
        attach_session_header(&mut response, session_id);
    }
    response
}
