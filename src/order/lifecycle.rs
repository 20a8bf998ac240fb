//! Order lifecycle tracker
//!
//! Transition rules for the order status machine and the derived tracking
//! projection the storefront renders. The engine never decides to cancel or
//! return an order on its own; those arrive as external events and are only
//! validated and rendered here.

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::models::{Order, OrderStatus, PaymentStatus};
use crate::error::EngineError;

/// The linear happy path, in order.
const HAPPY_PATH: [OrderStatus; 6] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
];

/// Fixed step definitions for the tracking projection: id, name, description.
const STEP_DEFS: [(&str, &str, &str); 6] = [
    (
        "placed",
        "Order Placed",
        "Your order has been placed and is awaiting confirmation",
    ),
    (
        "confirmed",
        "Order Confirmed",
        "Your order has been confirmed and is being prepared",
    ),
    (
        "processing",
        "Processing",
        "Your order is being processed and prepared for shipment",
    ),
    (
        "shipped",
        "Shipped",
        "Your order has been shipped and is on its way",
    ),
    (
        "out_for_delivery",
        "Out for Delivery",
        "Your order is out for delivery",
    ),
    ("delivered", "Delivered", "Your order has been delivered"),
];

/// Position of a status on the happy path; terminal branches have none.
pub fn happy_path_index(status: OrderStatus) -> Option<usize> {
    HAPPY_PATH.iter().position(|s| *s == status)
}

/// A status from which no further transition is expected.
pub fn is_terminal(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Returned
    )
}

/// Whether `to` is a legal next status: the next happy-path station, or a
/// branch to CANCELLED/RETURNED from any non-terminal state.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    if is_terminal(from) {
        return false;
    }
    match to {
        OrderStatus::Cancelled | OrderStatus::Returned => true,
        _ => match (happy_path_index(from), happy_path_index(to)) {
            (Some(f), Some(t)) => t == f + 1,
            _ => false,
        },
    }
}

/// Applies a status transition and its side effects to an order.
pub fn apply_transition(order: &mut Order, to: OrderStatus) -> Result<(), EngineError> {
    if !can_transition(order.status, to) {
        return Err(EngineError::InvalidTransition {
            from: order.status,
            to,
        });
    }

    match to {
        OrderStatus::Confirmed => {
            order.estimated_delivery_date = Some(order.created_at + Duration::days(7));
        }
        OrderStatus::Shipped => {
            let suffix = Uuid::new_v4().simple().to_string();
            order.tracking_number = Some(format!("TRK-{}", &suffix[..10]));
        }
        OrderStatus::Delivered => {
            // Cash on delivery is collected at the door.
            if order.payment_status == PaymentStatus::Pending {
                order.payment_status = PaymentStatus::Completed;
            }
        }
        OrderStatus::Cancelled | OrderStatus::Returned => {
            if order.payment_status == PaymentStatus::Completed {
                order.payment_status = PaymentStatus::Refunded;
            }
        }
        _ => {}
    }

    order.status = to;
    order.updated_at = Utc::now();
    Ok(())
}

/// One rendered step of the tracking timeline.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStep {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub completed: bool,
    pub current: bool,
}

/// Pure projection of a status onto the six tracking steps. Identical input
/// always yields the identical list; no clock involved.
///
/// On the happy path every step up to and including the current status is
/// `completed` and exactly one step is `current`. For the terminal branches
/// no step is current and none is completed: the order left the happy path,
/// and the terminal badge is rendered from the status itself.
pub fn tracking_steps(status: OrderStatus) -> Vec<TrackingStep> {
    let current_index = happy_path_index(status);

    STEP_DEFS
        .iter()
        .enumerate()
        .map(|(index, (id, name, description))| TrackingStep {
            id,
            name,
            description,
            completed: current_index.is_some_and(|c| index <= c),
            current: current_index == Some(index),
        })
        .collect()
}

/// Tracking payload returned by `GET /orders/track/:order_number`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTrackingView {
    pub order: Order,
    pub tracking_steps: Vec<TrackingStep>,
    pub terminal: bool,
}

impl OrderTrackingView {
    pub fn from_order(order: Order) -> Self {
        let tracking_steps = tracking_steps(order.status);
        let terminal = is_terminal(order.status);
        Self {
            order,
            tracking_steps,
            terminal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::models::Cart;
    use crate::catalog::ProductInfo;
    use crate::checkout::models::Address;
    use crate::checkout::payment::PaymentMethodSelection;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        let mut cart = Cart::new();
        cart.add_item(
            &ProductInfo {
                id: 1,
                name: "gym towel".into(),
                unit_price: dec!(9.99),
                discount_price: None,
                in_stock: true,
                max_quantity: None,
            },
            1,
        )
        .unwrap();
        Order::create(
            &cart,
            &Address {
                street: "1 Main St".into(),
                city: "Springfield".into(),
                state: "IL".into(),
                zip_code: "62701".into(),
                country: "US".into(),
                first_name: None,
                last_name: None,
                phone: None,
            },
            &PaymentMethodSelection::CashOnDelivery,
            None,
        )
    }

    fn flags(steps: &[TrackingStep]) -> Vec<(bool, bool)> {
        steps.iter().map(|s| (s.completed, s.current)).collect()
    }

    #[test]
    fn shipped_projection_is_deterministic() {
        let steps = tracking_steps(OrderStatus::Shipped);
        assert_eq!(
            flags(&steps),
            vec![
                (true, false),
                (true, false),
                (true, false),
                (true, true),
                (false, false),
                (false, false),
            ]
        );
        assert_eq!(steps[3].id, "shipped");
        // Same status, same list, every time.
        assert_eq!(steps, tracking_steps(OrderStatus::Shipped));
    }

    #[test]
    fn delivered_completes_everything() {
        let steps = tracking_steps(OrderStatus::Delivered);
        assert!(steps.iter().all(|s| s.completed));
        assert_eq!(steps.iter().filter(|s| s.current).count(), 1);
        assert!(steps[5].current);
    }

    #[test]
    fn cancelled_has_no_current_step() {
        for status in [OrderStatus::Cancelled, OrderStatus::Returned] {
            let steps = tracking_steps(status);
            assert!(steps.iter().all(|s| !s.current));
            assert!(steps.iter().all(|s| !s.completed));
            assert!(is_terminal(status));
        }
    }

    #[test]
    fn happy_path_advances_one_station_at_a_time() {
        assert!(can_transition(OrderStatus::Pending, OrderStatus::Confirmed));
        assert!(can_transition(
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered
        ));
        assert!(!can_transition(OrderStatus::Pending, OrderStatus::Shipped));
        assert!(!can_transition(OrderStatus::Shipped, OrderStatus::Confirmed));
    }

    #[test]
    fn branches_reachable_from_any_non_terminal_state() {
        for from in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::OutForDelivery,
        ] {
            assert!(can_transition(from, OrderStatus::Cancelled));
            assert!(can_transition(from, OrderStatus::Returned));
        }
        for from in [
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Returned,
        ] {
            assert!(!can_transition(from, OrderStatus::Cancelled));
        }
    }

    #[test]
    fn confirmation_sets_the_delivery_estimate() {
        let mut order = order();
        apply_transition(&mut order, OrderStatus::Confirmed).unwrap();
        assert_eq!(
            order.estimated_delivery_date,
            Some(order.created_at + Duration::days(7))
        );
    }

    #[test]
    fn shipping_assigns_a_tracking_number() {
        let mut order = order();
        apply_transition(&mut order, OrderStatus::Confirmed).unwrap();
        apply_transition(&mut order, OrderStatus::Processing).unwrap();
        apply_transition(&mut order, OrderStatus::Shipped).unwrap();
        assert!(order
            .tracking_number
            .as_deref()
            .is_some_and(|t| t.starts_with("TRK-")));
    }

    #[test]
    fn delivery_settles_cash_on_delivery() {
        let mut order = order();
        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ] {
            apply_transition(&mut order, status).unwrap();
        }
        assert_eq!(order.payment_status, PaymentStatus::Completed);
    }

    #[test]
    fn cancellation_refunds_a_settled_payment() {
        let mut order = order();
        order.payment_status = PaymentStatus::Completed;
        apply_transition(&mut order, OrderStatus::Cancelled).unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Refunded);
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let mut order = order();
        let err = apply_transition(&mut order, OrderStatus::Delivered).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert_eq!(order.status, OrderStatus::Pending);
    }
}
