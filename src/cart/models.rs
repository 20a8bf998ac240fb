//! Cart domain models
//!
//! Data structures for the cart aggregate and its wire representation. All
//! monetary figures are `Decimal` and serialize as strings; wire field names
//! are camelCase to match the storefront contract.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One product-quantity pairing within a cart.
///
/// `total_price` is always derived from the effective unit price and the
/// quantity; it is never written independently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: u64,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discounted_unit_price: Option<Decimal>,
    pub total_price: Decimal,
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_quantity: Option<u32>,
}

impl CartLineItem {
    /// The price a shopper actually pays per unit.
    pub fn effective_unit_price(&self) -> Decimal {
        match self.discounted_unit_price {
            Some(p) if p > Decimal::ZERO => p,
            _ => self.unit_price,
        }
    }
}

/// One shopper's cart. Items keep insertion order for display; totals do not
/// depend on it.
#[derive(Debug, Clone)]
pub struct Cart {
    pub items: Vec<CartLineItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn item(&self, product_id: u64) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

/// Derived money view over a cart. Recomputed fresh on every read.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub total_items: u32,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub discount_amount: Decimal,
    pub grand_total: Decimal,
}

/// Cart snapshot returned by every cart endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_id: String,
    pub items: Vec<CartLineItem>,
    #[serde(flatten)]
    pub totals: CartTotals,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartView {
    pub fn from_cart(cart_id: &str, cart: &Cart) -> Self {
        Self {
            cart_id: cart_id.to_string(),
            items: cart.items.clone(),
            totals: cart.totals(),
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }
    }

    /// The "not found means empty" snapshot for shoppers without a cart.
    pub fn empty(cart_id: &str) -> Self {
        Self::from_cart(cart_id, &Cart::new())
    }
}

/// Body of `POST /cart/add`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: u64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

/// Body of `PUT /cart/items/:product_id`.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

/// One problem found by `GET /cart/validate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartIssue {
    pub product_id: u64,
    pub issue: String,
}

/// Result of `GET /cart/validate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<CartIssue>,
}

fn default_quantity() -> u32 {
    1
}
