//! Checkout orchestrator
//!
//! A finite state machine over shipping → payment → review → success.
//! Advancing requires the current step's data to validate; backward
//! navigation is only permitted into steps already completed and never
//! un-completes them. Submission runs under a "processing" pseudo-state that
//! is distinct from the four persisted steps, so duplicate submissions are
//! rejected without polluting the step history.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::models::{Address, CheckoutStep};
use super::payment::PaymentMethodSelection;
use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub current_step: CheckoutStep,
    pub completed_steps: BTreeSet<CheckoutStep>,
    pub shipping_address: Option<Address>,
    pub payment: Option<PaymentMethodSelection>,
    /// True while an order submission is in flight.
    pub processing: bool,
    pub created_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn new() -> Self {
        Self {
            current_step: CheckoutStep::Shipping,
            completed_steps: BTreeSet::new(),
            shipping_address: None,
            payment: None,
            processing: false,
            created_at: Utc::now(),
        }
    }

    /// Confirms the shipping step and advances to payment.
    pub fn submit_shipping(&mut self, address: Address) -> Result<(), EngineError> {
        self.require_step(CheckoutStep::Shipping)?;
        address.validate()?;

        self.shipping_address = Some(address);
        self.completed_steps.insert(CheckoutStep::Shipping);
        self.current_step = CheckoutStep::Payment;
        Ok(())
    }

    /// Confirms the payment step with an already-validated selection and
    /// advances to review. The stored selection is replaced wholesale, so
    /// no field of a previously chosen variant survives a method switch.
    pub fn submit_payment(&mut self, selection: PaymentMethodSelection) -> Result<(), EngineError> {
        self.require_step(CheckoutStep::Payment)?;

        self.payment = Some(selection);
        self.completed_steps.insert(CheckoutStep::Payment);
        self.current_step = CheckoutStep::Review;
        Ok(())
    }

    /// Navigates back to an already-completed step. Landing on it does not
    /// remove it from the completed set; re-confirming it does the advance
    /// again.
    pub fn back(&mut self, target: CheckoutStep) -> Result<(), EngineError> {
        if self.processing {
            return Err(EngineError::SubmissionInProgress);
        }
        if target == self.current_step {
            return Ok(());
        }
        if !self.completed_steps.contains(&target) || target > self.current_step {
            return Err(EngineError::CheckoutStep(format!(
                "cannot navigate to {target} from {}",
                self.current_step
            )));
        }
        self.current_step = target;
        Ok(())
    }

    /// Enters the processing pseudo-state. Requires review to be the current
    /// step with shipping and payment both confirmed.
    pub fn begin_submission(&mut self) -> Result<(), EngineError> {
        if self.processing {
            return Err(EngineError::SubmissionInProgress);
        }
        if self.current_step != CheckoutStep::Review
            || !self.completed_steps.contains(&CheckoutStep::Shipping)
            || !self.completed_steps.contains(&CheckoutStep::Payment)
        {
            return Err(EngineError::CheckoutStep(
                "order submission requires a confirmed shipping address and payment method".into(),
            ));
        }
        self.processing = true;
        Ok(())
    }

    /// Reverts a failed submission: back to the payment step, forcing
    /// re-confirmation rather than a blind retry from review.
    pub fn fail_submission(&mut self) {
        self.processing = false;
        self.current_step = CheckoutStep::Payment;
    }

    fn require_step(&self, step: CheckoutStep) -> Result<(), EngineError> {
        if self.processing {
            return Err(EngineError::SubmissionInProgress);
        }
        if self.current_step != step {
            return Err(EngineError::CheckoutStep(format!(
                "expected the {step} step, currently on {}",
                self.current_step
            )));
        }
        Ok(())
    }
}

impl Default for CheckoutSession {
    fn default() -> Self {
        Self::new()
    }
}
