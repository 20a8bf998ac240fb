//! Commerce transaction engine
//!
//! The stateful core of a storefront: the cart aggregate with its mutation
//! coordinator, the checkout step orchestrator with per-variant payment
//! validation, and the order lifecycle tracker. Product pricing and
//! availability come from an external gateway; this crate owns the state
//! and the transition rules.

// Domain modules
pub mod cart;
pub mod checkout;
pub mod order;

// Collaborators and infrastructure
pub mod catalog;
pub mod error;
pub mod router;
pub mod session;
pub mod state;
