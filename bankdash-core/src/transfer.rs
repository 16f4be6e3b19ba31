//! Money-movement forms: local validation plus the submit lifecycle.
//!
//! Lifecycle: `Idle -> Submitting -> (Succeeded | Failed)`. A succeeded form
//! clears its fields and asks to be closed once `close_delay` has elapsed; a
//! failed form keeps its fields for a manual retry. Editing any field clears
//! the current message.

use std::time::{Duration, Instant};
use thiserror::Error;

use crate::model::{AmountRequest, TransferRequest};

pub const MAX_TRANSFER_AMOUNT: f64 = 10_000.0;
pub const DEFAULT_DESCRIPTION: &str = "Transfer";
pub const SUCCESS_CLOSE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Recipient account number is required")]
    RecipientRequired,
    #[error("Amount must be greater than 0")]
    InvalidAmount,
    #[error("Transfer amount cannot exceed $10,000")]
    AmountTooLarge,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("a submission is already in progress")]
    AlreadySubmitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Submitting,
    Succeeded { message: String, close_at: Instant },
    Failed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Error,
    Success,
}

impl FormState {
    fn message(&self) -> Option<(MessageKind, &str)> {
        match self {
            FormState::Succeeded { message, .. } => Some((MessageKind::Success, message)),
            FormState::Failed { message } => Some((MessageKind::Error, message)),
            _ => None,
        }
    }
}

/// Parse a typed amount: it must be a finite number strictly above zero.
pub fn parse_positive_amount(raw: &str) -> Result<f64, ValidationError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidAmount)?;
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidAmount);
    }
    Ok(value)
}

/// Client-side transfer rules, evaluated in order and stopping at the first failure.
pub fn validate_transfer(
    recipient: &str,
    amount: &str,
    description: &str,
) -> Result<TransferRequest, ValidationError> {
    if recipient.trim().is_empty() {
        return Err(ValidationError::RecipientRequired);
    }
    let amount = parse_positive_amount(amount)?;
    if amount > MAX_TRANSFER_AMOUNT {
        return Err(ValidationError::AmountTooLarge);
    }
    let description = if description.trim().is_empty() {
        DEFAULT_DESCRIPTION.to_string()
    } else {
        description.to_string()
    };
    Ok(TransferRequest {
        recipient_account_number: recipient.to_string(),
        amount,
        description,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferField {
    Recipient,
    Amount,
    Description,
}

impl TransferField {
    pub const ALL: [TransferField; 3] = [
        TransferField::Recipient,
        TransferField::Amount,
        TransferField::Description,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TransferField::Recipient => "Recipient Account Number",
            TransferField::Amount => "Amount ($)",
            TransferField::Description => "Description (Optional)",
        }
    }

    pub fn next(self) -> Self {
        match self {
            TransferField::Recipient => TransferField::Amount,
            TransferField::Amount => TransferField::Description,
            TransferField::Description => TransferField::Recipient,
        }
    }
}

/// The "Send Money" form.
#[derive(Debug, Clone)]
pub struct TransferForm {
    recipient: String,
    amount: String,
    description: String,
    state: FormState,
    close_delay: Duration,
}

impl Default for TransferForm {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferForm {
    pub fn new() -> Self {
        Self {
            recipient: String::new(),
            amount: String::new(),
            description: String::new(),
            state: FormState::Idle,
            close_delay: SUCCESS_CLOSE_DELAY,
        }
    }

    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    pub fn field(&self, field: TransferField) -> &str {
        match field {
            TransferField::Recipient => &self.recipient,
            TransferField::Amount => &self.amount,
            TransferField::Description => &self.description,
        }
    }

    /// Replace a field. Inputs are locked while a submission is outstanding;
    /// returns whether the edit was applied.
    pub fn edit(&mut self, field: TransferField, value: impl Into<String>) -> bool {
        if self.is_submitting() {
            return false;
        }
        let value = value.into();
        match field {
            TransferField::Recipient => self.recipient = value,
            TransferField::Amount => self.amount = value,
            TransferField::Description => self.description = value,
        }
        self.state = FormState::Idle;
        true
    }

    pub fn validate(&self) -> Result<TransferRequest, ValidationError> {
        validate_transfer(&self.recipient, &self.amount, &self.description)
    }

    /// Validate and enter `Submitting`. The returned request is what goes on
    /// the wire; callers must report back through `finish_ok`/`finish_err`.
    pub fn begin_submit(&mut self) -> Result<TransferRequest, FormError> {
        if self.is_submitting() {
            return Err(FormError::AlreadySubmitting);
        }
        match self.validate() {
            Ok(req) => {
                self.state = FormState::Submitting;
                Ok(req)
            }
            Err(e) => {
                self.state = FormState::Failed {
                    message: e.to_string(),
                };
                Err(e.into())
            }
        }
    }

    pub fn finish_ok(&mut self, now: Instant) {
        self.recipient.clear();
        self.amount.clear();
        self.description.clear();
        self.state = FormState::Succeeded {
            message: "Transfer completed successfully!".to_string(),
            close_at: now + self.close_delay,
        };
    }

    /// Server message wins when present; otherwise a generic retry prompt.
    pub fn finish_err(&mut self, server_message: Option<&str>) {
        let message = server_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("Transfer failed. Please try again.")
            .to_string();
        self.state = FormState::Failed { message };
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        self.state == FormState::Submitting
    }

    pub fn message(&self) -> Option<(MessageKind, &str)> {
        self.state.message()
    }

    pub fn should_close(&self, now: Instant) -> bool {
        matches!(self.state, FormState::Succeeded { close_at, .. } if now >= close_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountAction {
    Deposit,
    Withdrawal,
}

impl AmountAction {
    pub fn title(&self) -> &'static str {
        match self {
            AmountAction::Deposit => "Deposit",
            AmountAction::Withdrawal => "Withdraw",
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            AmountAction::Deposit => "Deposit completed successfully!",
            AmountAction::Withdrawal => "Withdrawal completed successfully!",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            AmountAction::Deposit => "Deposit failed. Please try again.",
            AmountAction::Withdrawal => "Withdrawal failed. Please try again.",
        }
    }
}

/// Single-field form used for deposits and withdrawals.
#[derive(Debug, Clone)]
pub struct AmountForm {
    action: AmountAction,
    amount: String,
    state: FormState,
    close_delay: Duration,
}

impl AmountForm {
    pub fn new(action: AmountAction) -> Self {
        Self {
            action,
            amount: String::new(),
            state: FormState::Idle,
            close_delay: SUCCESS_CLOSE_DELAY,
        }
    }

    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    pub fn action(&self) -> AmountAction {
        self.action
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }

    pub fn edit(&mut self, value: impl Into<String>) -> bool {
        if self.is_submitting() {
            return false;
        }
        self.amount = value.into();
        self.state = FormState::Idle;
        true
    }

    pub fn begin_submit(&mut self) -> Result<AmountRequest, FormError> {
        if self.is_submitting() {
            return Err(FormError::AlreadySubmitting);
        }
        match parse_positive_amount(&self.amount) {
            Ok(amount) => {
                self.state = FormState::Submitting;
                Ok(AmountRequest { amount })
            }
            Err(e) => {
                self.state = FormState::Failed {
                    message: e.to_string(),
                };
                Err(e.into())
            }
        }
    }

    pub fn finish_ok(&mut self, now: Instant) {
        self.amount.clear();
        self.state = FormState::Succeeded {
            message: self.action.success_message().to_string(),
            close_at: now + self.close_delay,
        };
    }

    pub fn finish_err(&mut self, server_message: Option<&str>) {
        let message = server_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(self.action.failure_message())
            .to_string();
        self.state = FormState::Failed { message };
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        self.state == FormState::Submitting
    }

    pub fn message(&self) -> Option<(MessageKind, &str)> {
        self.state.message()
    }

    pub fn should_close(&self, now: Instant) -> bool {
        matches!(self.state, FormState::Succeeded { close_at, .. } if now >= close_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(recipient: &str, amount: &str, description: &str) -> TransferForm {
        let mut f = TransferForm::new();
        f.edit(TransferField::Recipient, recipient);
        f.edit(TransferField::Amount, amount);
        f.edit(TransferField::Description, description);
        f
    }

    #[test]
    fn test_amount_boundaries() {
        assert_eq!(
            validate_transfer("ACC1", "0", "").unwrap_err(),
            ValidationError::InvalidAmount
        );
        assert!(ValidationError::InvalidAmount
            .to_string()
            .contains("must be greater than 0"));

        let too_much = validate_transfer("ACC1", "10000.01", "").unwrap_err();
        assert_eq!(too_much, ValidationError::AmountTooLarge);
        assert!(too_much.to_string().contains("cannot exceed $10,000"));

        let ok = validate_transfer("ACC1", "10000", "").unwrap();
        assert_eq!(ok.amount, 10_000.0);
        assert!(validate_transfer("ACC1", "0.01", "").is_ok());
    }

    #[test]
    fn test_invalid_amount_inputs() {
        for raw in ["", "   ", "-5", "abc", "NaN", "inf"] {
            assert_eq!(
                validate_transfer("ACC1", raw, "").unwrap_err(),
                ValidationError::InvalidAmount,
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn test_recipient_checked_first() {
        assert_eq!(
            validate_transfer("", "0", "").unwrap_err(),
            ValidationError::RecipientRequired
        );
        assert_eq!(
            validate_transfer(" \t ", "50", "").unwrap_err(),
            ValidationError::RecipientRequired
        );
    }

    #[test]
    fn test_description_defaults() {
        let req = validate_transfer("ACC7", "25.5", "").unwrap();
        assert_eq!(req.description, "Transfer");
        assert_eq!(req.amount, 25.5);
        assert_eq!(validate_transfer("ACC7", "1", "   ").unwrap().description, "Transfer");
        assert_eq!(validate_transfer("ACC7", "1", "rent").unwrap().description, "rent");
    }

    #[test]
    fn test_failed_validation_sets_message_and_stays_idle_on_edit() {
        let mut form = filled("", "10", "");
        let err = form.begin_submit().unwrap_err();
        assert_eq!(err, FormError::Invalid(ValidationError::RecipientRequired));
        assert_eq!(
            form.message(),
            Some((MessageKind::Error, "Recipient account number is required"))
        );

        form.edit(TransferField::Recipient, "ACC2");
        assert_eq!(form.message(), None);
        assert_eq!(form.state(), &FormState::Idle);
    }

    #[test]
    fn test_in_flight_guard() {
        let mut form = filled("ACC2", "10", "");
        assert!(form.begin_submit().is_ok());
        assert_eq!(form.begin_submit().unwrap_err(), FormError::AlreadySubmitting);
        assert!(!form.edit(TransferField::Amount, "99"));
        assert_eq!(form.field(TransferField::Amount), "10");
    }

    #[test]
    fn test_success_clears_and_closes_after_delay() {
        let mut form = filled("ACC2", "10", "lunch");
        form.begin_submit().unwrap();
        let now = Instant::now();
        form.finish_ok(now);

        assert_eq!(
            form.message(),
            Some((MessageKind::Success, "Transfer completed successfully!"))
        );
        for f in TransferField::ALL {
            assert!(form.field(f).is_empty());
        }
        assert!(!form.should_close(now));
        assert!(!form.should_close(now + Duration::from_millis(1999)));
        assert!(form.should_close(now + SUCCESS_CLOSE_DELAY));
    }

    #[test]
    fn test_failure_keeps_fields_for_retry() {
        let mut form = filled("ACC2", "10", "");
        form.begin_submit().unwrap();
        form.finish_err(Some("Insufficient balance"));
        assert_eq!(form.message(), Some((MessageKind::Error, "Insufficient balance")));
        assert_eq!(form.field(TransferField::Recipient), "ACC2");
        assert!(!form.should_close(Instant::now() + Duration::from_secs(60)));

        form.begin_submit().unwrap();
        form.finish_err(None);
        assert_eq!(
            form.message(),
            Some((MessageKind::Error, "Transfer failed. Please try again."))
        );
    }

    #[test]
    fn test_amount_form() {
        let mut form = AmountForm::new(AmountAction::Deposit);
        assert!(form.begin_submit().is_err());
        form.edit("250");
        assert_eq!(form.begin_submit().unwrap(), AmountRequest { amount: 250.0 });
        assert_eq!(form.begin_submit().unwrap_err(), FormError::AlreadySubmitting);
        form.finish_ok(Instant::now());
        assert_eq!(
            form.message(),
            Some((MessageKind::Success, "Deposit completed successfully!"))
        );
        assert!(form.amount().is_empty());

        let mut w = AmountForm::new(AmountAction::Withdrawal);
        w.edit("20000");
        w.begin_submit().unwrap();
        w.finish_err(None);
        assert_eq!(
            w.message(),
            Some((MessageKind::Error, "Withdrawal failed. Please try again."))
        );
    }
}
