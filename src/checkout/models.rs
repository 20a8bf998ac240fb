//! Checkout domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payment::PaymentMethodSelection;
use super::session::CheckoutSession;
use crate::error::EngineError;

/// One step of the checkout flow. Ordered: the derived `Ord` is the forward
/// direction of the state machine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStep {
    Shipping,
    Payment,
    Review,
    Success,
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Shipping => "shipping",
            Self::Payment => "payment",
            Self::Review => "review",
            Self::Success => "success",
        };
        f.write_str(name)
    }
}

/// Shipping (or billing) address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Address {
    /// Checks the required fields, reporting the first empty one.
    pub fn validate(&self) -> Result<(), EngineError> {
        let required = [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zipCode", &self.zip_code),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(EngineError::AddressValidation { field });
            }
        }
        Ok(())
    }

    /// Single-line form stored on the order record.
    pub fn to_formatted_string(&self) -> String {
        format!(
            "{}, {}, {} {}, {}",
            self.street, self.city, self.state, self.zip_code, self.country
        )
    }
}

/// Body of `POST /checkout/back`.
#[derive(Debug, Deserialize)]
pub struct BackRequest {
    pub step: CheckoutStep,
}

/// Body of `POST /checkout/submit`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub customer_notes: Option<String>,
}

/// Session state returned by every checkout endpoint. Payment details are
/// never echoed back; only the method label is.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    pub current_step: CheckoutStep,
    pub completed_steps: Vec<CheckoutStep>,
    pub processing: bool,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<&'static str>,
}

impl CheckoutView {
    pub fn from_session(session: &CheckoutSession) -> Self {
        Self {
            current_step: session.current_step,
            completed_steps: session.completed_steps.iter().copied().collect(),
            processing: session.processing,
            started_at: session.created_at,
            shipping_address: session.shipping_address.clone(),
            payment_method: session
                .payment
                .as_ref()
                .map(PaymentMethodSelection::method_label),
        }
    }
}
