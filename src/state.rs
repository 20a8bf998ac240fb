//! Shared application state
//!
//! Carts, checkout sessions and orders live in `DashMap`s behind one `Arc`,
//! so handlers can touch them concurrently without an outer mutex. The
//! in-flight set backs the mutation coordinator's per-line-item guard.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};

use crate::cart::models::Cart;
use crate::catalog::PricingAvailabilityGateway;
use crate::checkout::session::CheckoutSession;
use crate::order::models::Order;

/// Shared application state that can be safely passed between threads.
pub type SharedState = Arc<AppState>;

/// Identifier of one shopper session; also the cart key.
pub type SessionId = String;

pub struct AppState {
    /// One cart per shopper session, created lazily on first mutation.
    pub carts: DashMap<SessionId, Cart>,

    /// Active checkout sessions. Dropped on success or explicit cancel.
    pub checkouts: DashMap<SessionId, CheckoutSession>,

    /// Orders keyed by order number. The engine only ever appends and
    /// applies status transitions.
    pub orders: DashMap<String, Order>,

    /// Line items with a mutation currently in flight, keyed by
    /// `(session, product)`. Guards the reject-if-busy rule.
    pub in_flight: DashSet<(SessionId, u64)>,

    /// Authoritative source of pricing and availability.
    pub catalog: Arc<dyn PricingAvailabilityGateway>,
}

impl AppState {
    pub fn new(catalog: Arc<dyn PricingAvailabilityGateway>) -> Self {
        Self {
            carts: DashMap::new(),
            checkouts: DashMap::new(),
            orders: DashMap::new(),
            in_flight: DashSet::new(),
            catalog,
        }
    }
}
