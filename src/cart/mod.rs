//! Cart domain module
//!
//! The cart aggregate (line items, quantity bounds, derived totals), the
//! mutation coordinator that serializes per-item mutations and reconciles
//! against the pricing gateway, and the REST handlers over both.

pub mod aggregate;
pub mod coordinator;
pub mod handlers;
pub mod models;

pub use handlers::routes;
