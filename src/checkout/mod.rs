//! Checkout domain module
//!
//! The step orchestrator (shipping → payment → review → success), the
//! payment method union with its variant-specific validation, and the REST
//! handlers that drive them.

pub mod handlers;
pub mod models;
pub mod payment;
pub mod session;

pub use handlers::routes;
