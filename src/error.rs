//! Error taxonomy for the commerce engine
//!
//! Every failure a handler can produce maps onto one of these variants, and
//! every variant maps onto a single HTTP status. Validation failures are
//! caller mistakes and are logged at debug level only; gateway failures are
//! system-facing and logged at warn.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;

use crate::catalog::GatewayError;
use crate::order::models::OrderStatus;

/// All errors surfaced by cart, checkout and order operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Quantity is zero/negative or would exceed the item's purchase limit.
    /// Rejected before any gateway call is made.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// The referenced product is not a line item of the cart.
    #[error("product {0} is not in the cart")]
    ItemNotFound(u64),

    /// Another mutation for the same line item is still in flight.
    /// Callers should keep the triggering control disabled, not alert.
    #[error("another update for this item is still in flight")]
    MutationInProgress,

    /// A checkout submission for this session is already being processed.
    #[error("an order submission is already in progress")]
    SubmissionInProgress,

    /// The pricing/availability gateway failed; surfaced verbatim.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Availability or pricing changed between validation and submission.
    /// The caller must re-fetch the cart before retrying.
    #[error("cart contents changed: {0}")]
    StockConflict(String),

    /// A payment field failed variant-specific validation. Only the first
    /// offending field is reported.
    #[error("{field}: {message}")]
    PaymentValidation {
        field: &'static str,
        message: String,
    },

    /// A required shipping address field is empty.
    #[error("{field} is required")]
    AddressValidation { field: &'static str },

    /// Illegal checkout navigation or a step advanced without its data.
    #[error("checkout step not permitted: {0}")]
    CheckoutStep(String),

    /// No order exists with the given order number.
    #[error("order {0} not found")]
    OrderNotFound(String),

    /// The requested order status change is not a legal transition.
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

impl EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidQuantity(_)
            | Self::PaymentValidation { .. }
            | Self::AddressValidation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ItemNotFound(_) | Self::OrderNotFound(_) => StatusCode::NOT_FOUND,
            Self::MutationInProgress
            | Self::SubmissionInProgress
            | Self::StockConflict(_)
            | Self::CheckoutStep(_)
            | Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        match &self {
            EngineError::Gateway(e) => tracing::warn!(error = %e, "gateway failure"),
            other => tracing::debug!(error = %other, "request rejected"),
        }

        let status = self.status_code();
        let mut body = json!({ "error": self.to_string() });

        match &self {
            EngineError::PaymentValidation { field, .. }
            | EngineError::AddressValidation { field } => {
                body["field"] = json!(field);
            }
            EngineError::StockConflict(_) => {
                body["requiresCartRefresh"] = json!(true);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            EngineError::InvalidQuantity("qty".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            EngineError::MutationInProgress.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            EngineError::StockConflict("drift".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            EngineError::OrderNotFound("ORD-1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            EngineError::Gateway(GatewayError::Unavailable("down".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
