//! Payment method selection and validation
//!
//! The five payment variants are a tagged union: exactly one variant's
//! fields exist at a time, so switching methods can never leak stale fields
//! from a previously filled variant into the submitted payload. Validation
//! is variant-specific, runs entirely locally, and reports the first
//! offending field.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Forward window, in years, within which a card expiry year is accepted.
const EXPIRY_YEAR_WINDOW: i32 = 10;

/// Wire discriminant of the payment union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethodKind {
    CreditCard,
    DebitCard,
    Paypal,
    DigitalWallet,
    CashOnDelivery,
}

/// Raw, all-optional field bag as it arrives on the wire. Only the fields
/// belonging to the selected variant are ever inspected.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    pub card_number: Option<String>,
    pub card_holder_name: Option<String>,
    pub expiry_month: Option<u32>,
    pub expiry_year: Option<i32>,
    pub cvv: Option<String>,
    pub paypal_email: Option<String>,
    pub wallet_type: Option<String>,
}

/// Body of `POST /checkout/payment`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub payment_method: PaymentMethodKind,
    #[serde(default)]
    pub payment_details: Option<PaymentDetails>,
}

/// Validated card payload shared by the credit and debit variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDetails {
    /// Digits only; separators are stripped during validation.
    pub card_number: String,
    pub card_holder_name: String,
    pub expiry_month: u32,
    pub expiry_year: i32,
    pub cvv: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletType {
    ApplePay,
    GooglePay,
    SamsungPay,
}

/// One validated payment method. Constructing a new selection replaces the
/// previous one wholesale, which is what clears unrelated variant fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethodSelection {
    CreditCard(CardDetails),
    DebitCard(CardDetails),
    Paypal { email: String },
    DigitalWallet { wallet_type: WalletType },
    CashOnDelivery,
}

impl PaymentMethodSelection {
    /// Validates the raw request against the selected variant's rules.
    pub fn from_request(request: &PaymentRequest) -> Result<Self, EngineError> {
        Self::validate(
            request.payment_method,
            request.payment_details.as_ref(),
            Utc::now().year(),
        )
    }

    /// Variant-specific validation with an explicit current year, so the
    /// expiry window is testable without a clock.
    pub fn validate(
        kind: PaymentMethodKind,
        details: Option<&PaymentDetails>,
        current_year: i32,
    ) -> Result<Self, EngineError> {
        let empty = PaymentDetails::default();
        let details = details.unwrap_or(&empty);

        match kind {
            PaymentMethodKind::CreditCard => {
                Ok(Self::CreditCard(validate_card(details, current_year)?))
            }
            PaymentMethodKind::DebitCard => {
                Ok(Self::DebitCard(validate_card(details, current_year)?))
            }
            PaymentMethodKind::Paypal => {
                let email = details
                    .paypal_email
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .ok_or_else(|| field_error("paypalEmail", "PayPal email is required"))?;
                if !is_mailbox_shaped(email) {
                    return Err(field_error("paypalEmail", "valid PayPal email is required"));
                }
                Ok(Self::Paypal {
                    email: email.to_string(),
                })
            }
            PaymentMethodKind::DigitalWallet => {
                let raw = details
                    .wallet_type
                    .as_deref()
                    .filter(|w| !w.is_empty())
                    .ok_or_else(|| field_error("walletType", "please select a wallet type"))?;
                let wallet_type = match raw {
                    "apple_pay" => WalletType::ApplePay,
                    "google_pay" => WalletType::GooglePay,
                    "samsung_pay" => WalletType::SamsungPay,
                    other => {
                        return Err(field_error(
                            "walletType",
                            format!("unrecognized wallet type: {other}"),
                        ))
                    }
                };
                Ok(Self::DigitalWallet { wallet_type })
            }
            // No payload; always valid.
            PaymentMethodKind::CashOnDelivery => Ok(Self::CashOnDelivery),
        }
    }

    /// Wire label stored on the order record.
    pub fn method_label(&self) -> &'static str {
        match self {
            Self::CreditCard(_) => "CREDIT_CARD",
            Self::DebitCard(_) => "DEBIT_CARD",
            Self::Paypal { .. } => "PAYPAL",
            Self::DigitalWallet { .. } => "DIGITAL_WALLET",
            Self::CashOnDelivery => "CASH_ON_DELIVERY",
        }
    }
}

fn validate_card(details: &PaymentDetails, current_year: i32) -> Result<CardDetails, EngineError> {
    let raw_number = details
        .card_number
        .as_deref()
        .ok_or_else(|| field_error("cardNumber", "card number is required"))?;
    let card_number: String = raw_number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    if card_number.is_empty() || !card_number.chars().all(|c| c.is_ascii_digit()) {
        return Err(field_error("cardNumber", "card number must be digits"));
    }
    if !(13..=19).contains(&card_number.len()) {
        return Err(field_error(
            "cardNumber",
            "card number must be 13 to 19 digits",
        ));
    }

    let card_holder_name = details
        .card_holder_name
        .as_deref()
        .map(str::trim)
        .filter(|n| n.len() >= 2)
        .ok_or_else(|| field_error("cardHolderName", "cardholder name is required"))?
        .to_string();

    let expiry_month = details
        .expiry_month
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| field_error("expiryMonth", "expiry month must be between 1 and 12"))?;

    let expiry_year = details
        .expiry_year
        .filter(|y| (current_year..=current_year + EXPIRY_YEAR_WINDOW).contains(y))
        .ok_or_else(|| field_error("expiryYear", "expiry year is out of range"))?;

    let cvv = details
        .cvv
        .as_deref()
        .filter(|c| (3..=4).contains(&c.len()) && c.chars().all(|ch| ch.is_ascii_digit()))
        .ok_or_else(|| field_error("cvv", "CVV must be 3 or 4 digits"))?
        .to_string();

    Ok(CardDetails {
        card_number,
        card_holder_name,
        expiry_month,
        expiry_year,
        cvv,
    })
}

/// Minimal mailbox-shape check: one `@` with a non-empty local part and a
/// dotted domain, no whitespace.
fn is_mailbox_shaped(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn field_error(field: &'static str, message: impl Into<String>) -> EngineError {
    EngineError::PaymentValidation {
        field,
        message: message.into(),
    }
}
