//! Cart aggregate operations
//!
//! Pure mutation and totalling logic for a single shopper's cart. Quantity
//! bounds are enforced here, before any gateway traffic; a violation leaves
//! the cart untouched. Totals are a pure function of the current items and
//! are recomputed on every read.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::models::{Cart, CartLineItem, CartTotals};
use crate::catalog::ProductInfo;
use crate::error::EngineError;

/// Flat tax applied to the subtotal.
pub(crate) const TAX_RATE: Decimal = dec!(0.10);
/// Subtotal at or above which shipping is free.
pub(crate) const FREE_SHIPPING_THRESHOLD: Decimal = dec!(100);
/// Domestic base rate used for the cart preview. Order creation applies the
/// country table instead.
const BASE_SHIPPING: Decimal = dec!(5.00);

impl Cart {
    /// Adds `quantity` units of a product, merging into an existing line.
    ///
    /// Exceeding the purchase limit rejects the whole call rather than
    /// clamping, so the shopper sees exactly what they asked for or an error.
    pub fn add_item(&mut self, info: &ProductInfo, quantity: u32) -> Result<(), EngineError> {
        if quantity < 1 {
            return Err(EngineError::InvalidQuantity(
                "quantity must be at least 1".into(),
            ));
        }

        let merged = match self.item(info.id) {
            Some(line) => line.quantity.checked_add(quantity).ok_or_else(|| {
                EngineError::InvalidQuantity("merged quantity is too large".into())
            })?,
            None => quantity,
        };
        check_limit(merged, info.max_quantity)?;

        if let Some(line) = self.items.iter_mut().find(|i| i.product_id == info.id) {
            line.quantity = merged;
            refresh_line(line, info);
        } else {
            self.items.push(line_from(info, quantity));
        }
        self.touch();
        Ok(())
    }

    /// Sets the stored quantity of an existing line. Zero removes the line;
    /// a zero-quantity row is never retained.
    pub fn set_quantity(&mut self, info: &ProductInfo, quantity: u32) -> Result<(), EngineError> {
        if self.item(info.id).is_none() {
            return Err(EngineError::ItemNotFound(info.id));
        }
        if quantity == 0 {
            self.remove_item(info.id);
            return Ok(());
        }
        check_limit(quantity, info.max_quantity)?;

        if let Some(line) = self.items.iter_mut().find(|i| i.product_id == info.id) {
            line.quantity = quantity;
            refresh_line(line, info);
        }
        self.touch();
        Ok(())
    }

    /// Removes a line. Returns whether anything was actually removed;
    /// removing an absent line is not an error.
    pub fn remove_item(&mut self, product_id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        let removed = self.items.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Derived totals. Unavailable items still contribute: they stay visible
    /// in the cart and are only excluded from checkout eligibility.
    pub fn totals(&self) -> CartTotals {
        let total_items = self
            .items
            .iter()
            .fold(0u32, |acc, i| acc.saturating_add(i.quantity));
        let subtotal: Decimal = self.items.iter().map(|i| i.total_price).sum();
        let tax_amount = (subtotal * TAX_RATE).round_dp(2);
        let shipping_amount = if self.items.is_empty() || subtotal >= FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            BASE_SHIPPING
        };
        // Order-level coupon figure; line discounts are already inside the
        // subtotal via the effective unit price.
        let discount_amount = Decimal::ZERO;
        let grand_total =
            (subtotal + tax_amount + shipping_amount - discount_amount).max(Decimal::ZERO);

        CartTotals {
            total_items,
            subtotal,
            tax_amount,
            shipping_amount,
            discount_amount,
            grand_total,
        }
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now();
    }
}

fn check_limit(quantity: u32, max_quantity: Option<u32>) -> Result<(), EngineError> {
    match max_quantity {
        Some(max) if quantity > max => Err(EngineError::InvalidQuantity(format!(
            "requested quantity {quantity} exceeds the limit of {max}"
        ))),
        _ => Ok(()),
    }
}

/// Builds a line item from fresh catalog truth.
pub fn line_from(info: &ProductInfo, quantity: u32) -> CartLineItem {
    let mut line = CartLineItem {
        product_id: info.id,
        product_name: info.name.clone(),
        quantity,
        unit_price: info.unit_price,
        discounted_unit_price: info.discount_price,
        total_price: Decimal::ZERO,
        is_available: info.in_stock,
        max_quantity: info.max_quantity,
    };
    line.total_price = line_total(&line);
    line
}

/// Overwrites a line's pricing and availability with fresh catalog truth and
/// recomputes the derived total.
pub fn refresh_line(line: &mut CartLineItem, info: &ProductInfo) {
    line.product_name = info.name.clone();
    line.unit_price = info.unit_price;
    line.discounted_unit_price = info.discount_price;
    line.is_available = info.in_stock;
    line.max_quantity = info.max_quantity;
    line.total_price = line_total(line);
}

fn line_total(line: &CartLineItem) -> Decimal {
    (line.effective_unit_price() * Decimal::from(line.quantity)).round_dp(2)
}
