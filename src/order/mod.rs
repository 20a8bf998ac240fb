//! Order domain module
//!
//! Order creation from a checkout, the status state machine, and the derived
//! tracking projection.

pub mod handlers;
pub mod lifecycle;
pub mod models;

pub use handlers::routes;
