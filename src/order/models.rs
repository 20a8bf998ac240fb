//! Order domain models
//!
//! An order is created once, atomically, from a validated checkout session
//! and a cart snapshot. Its monetary figures are frozen at creation and are
//! never recomputed from live prices; only status transitions mutate it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::aggregate::{FREE_SHIPPING_THRESHOLD, TAX_RATE};
use crate::cart::models::Cart;
use crate::checkout::models::Address;
use crate::checkout::payment::PaymentMethodSelection;

/// Order lifecycle status. The first six form the linear happy path;
/// CANCELLED and RETURNED are terminal branches reachable from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
    Returned,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::OutForDelivery => "OUT_FOR_DELIVERY",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Returned => "RETURNED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

/// Immutable snapshot of one purchased line item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: u64,
    pub product_name: String,
    pub quantity: u32,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<Decimal>,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub shipping_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates an order from a cart snapshot and confirmed checkout data.
    /// All amounts are computed here once and frozen.
    pub fn create(
        cart: &Cart,
        shipping_address: &Address,
        payment: &PaymentMethodSelection,
        customer_notes: Option<String>,
    ) -> Self {
        let items: Vec<OrderItem> = cart
            .items
            .iter()
            .map(|line| OrderItem {
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                price: line.unit_price,
                discount_price: line.discounted_unit_price,
                total_price: line.total_price,
            })
            .collect();

        let subtotal: Decimal = items.iter().map(|i| i.total_price).sum();
        let tax_amount = (subtotal * TAX_RATE).round_dp(2);
        let shipping_amount = shipping_for(subtotal, &shipping_address.country);
        let discount_amount = Decimal::ZERO;
        let total_amount =
            (subtotal - discount_amount + shipping_amount + tax_amount).max(Decimal::ZERO);

        // Cash on delivery is collected later; everything else is charged
        // at submission.
        let payment_status = match payment {
            PaymentMethodSelection::CashOnDelivery => PaymentStatus::Pending,
            _ => PaymentStatus::Completed,
        };

        let now = Utc::now();
        Self {
            order_number: generate_order_number(),
            status: OrderStatus::Pending,
            payment_status,
            payment_method: payment.method_label().to_string(),
            items,
            subtotal,
            tax_amount,
            shipping_amount,
            discount_amount,
            total_amount,
            shipping_address: shipping_address.to_formatted_string(),
            customer_notes,
            tracking_number: None,
            estimated_delivery_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Country shipping table, with free shipping above the cart threshold.
fn shipping_for(subtotal: Decimal, country: &str) -> Decimal {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        return Decimal::ZERO;
    }
    match country.to_ascii_uppercase().as_str() {
        "RW" | "RWANDA" => dec!(5.00),
        "US" | "CA" | "GB" => dec!(15.00),
        "AU" | "DE" | "FR" | "IT" | "ES" => dec!(20.00),
        _ => dec!(25.00),
    }
}

/// Opaque display id: millisecond timestamp plus a short random suffix to
/// keep concurrent submissions distinct.
fn generate_order_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ORD-{}-{}", Utc::now().timestamp_millis(), &suffix[..6])
}

/// Body of `PUT /orders/:order_number/status`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductInfo;

    fn cart_with_one_item(price: Decimal, quantity: u32) -> Cart {
        let mut cart = Cart::new();
        cart.add_item(
            &ProductInfo {
                id: 1,
                name: "foam roller".into(),
                unit_price: price,
                discount_price: None,
                in_stock: true,
                max_quantity: None,
            },
            quantity,
        )
        .unwrap();
        cart
    }

    fn address(country: &str) -> Address {
        Address {
            street: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip_code: "62701".into(),
            country: country.into(),
            first_name: None,
            last_name: None,
            phone: None,
        }
    }

    #[test]
    fn totals_are_frozen_at_creation() {
        let cart = cart_with_one_item(dec!(30.00), 2);
        let order = Order::create(
            &cart,
            &address("US"),
            &PaymentMethodSelection::CashOnDelivery,
            None,
        );

        assert_eq!(order.subtotal, dec!(60.00));
        assert_eq!(order.tax_amount, dec!(6.00));
        assert_eq!(order.shipping_amount, dec!(15.00));
        assert_eq!(order.total_amount, dec!(81.00));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn shipping_table_by_country() {
        assert_eq!(shipping_for(dec!(50), "RW"), dec!(5.00));
        assert_eq!(shipping_for(dec!(50), "rwanda"), dec!(5.00));
        assert_eq!(shipping_for(dec!(50), "GB"), dec!(15.00));
        assert_eq!(shipping_for(dec!(50), "DE"), dec!(20.00));
        assert_eq!(shipping_for(dec!(50), "BR"), dec!(25.00));
        assert_eq!(shipping_for(dec!(120), "BR"), Decimal::ZERO);
    }

    #[test]
    fn order_numbers_are_unique_and_prefixed() {
        let a = generate_order_number();
        let b = generate_order_number();
        assert!(a.starts_with("ORD-"));
        assert_ne!(a, b);
    }

    #[test]
    fn non_cod_payment_is_completed_at_creation() {
        let cart = cart_with_one_item(dec!(10.00), 1);
        let order = Order::create(
            &cart,
            &address("US"),
            &PaymentMethodSelection::Paypal {
                email: "shopper@example.com".into(),
            },
            Some("leave at the door".into()),
        );
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert_eq!(order.payment_method, "PAYPAL");
        assert_eq!(order.customer_notes.as_deref(), Some("leave at the door"));
    }
}
