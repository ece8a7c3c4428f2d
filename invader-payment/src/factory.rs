//! Transaction factory: initial transaction fields from a payable

use crate::error::{PaymentError, PaymentResult};
use crate::money::Money;
use crate::types::{Payable, PaymentMethod, PaymentMode, PaymentToken};

/// Transaction fields collected before the record is persisted
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub reference: String,
    pub payable_id: i64,
    pub partner_id: i64,
    pub amount: Money,
    pub payment_mode_id: i64,
    pub acquirer_id: i64,
    pub payment_token_id: Option<i64>,
    pub tx_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

/// Draft for paying `payable` through `payment_mode`
pub fn prepare(payable: &Payable, payment_mode: &PaymentMode) -> TransactionDraft {
    TransactionDraft {
        reference: payable.reference.clone(),
        payable_id: payable.id,
        partner_id: payable.partner.id,
        amount: payable.amount,
        payment_mode_id: payment_mode.id,
        acquirer_id: payment_mode.acquirer.id,
        payment_token_id: None,
        tx_id: None,
        payment_method: None,
    }
}

impl TransactionDraft {
    pub fn token(mut self, token: &PaymentToken) -> Self {
        self.payment_token_id = Some(token.id);
        self
    }

    pub fn tx_id(mut self, tx_id: impl Into<String>) -> Self {
        self.tx_id = Some(tx_id.into());
        self
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    /// Token id, failing when required fields are missing
    pub fn ensure_complete(&self) -> PaymentResult<i64> {
        if self.reference.trim().is_empty() {
            return Err(PaymentError::Validation(
                "transaction reference is required".to_string(),
            ));
        }
        if !self.amount.is_positive() {
            return Err(PaymentError::Validation(format!(
                "transaction amount must be positive, got {}",
                self.amount
            )));
        }
        self.payment_token_id.ok_or_else(|| {
            PaymentError::Validation("transaction payment token is required".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Acquirer, Partner};
    use chrono::Utc;

    fn payable(amount: i64) -> Payable {
        Payable::new(42, "SO042", Partner::new(7, "Maria"), Money::brl(amount))
    }

    fn mode() -> PaymentMode {
        PaymentMode::new(3, "PIX", Acquirer::new(2, "Banco do Brasil", "bacenpix"))
    }

    fn token() -> PaymentToken {
        let mut token = PaymentToken::new(&mode().acquirer, &payable(1), PaymentMethod::Pix);
        token.id = 9;
        token.created_at = Utc::now();
        token
    }

    #[test]
    fn test_prepare_copies_payable_and_mode() {
        let draft = prepare(&payable(1990), &mode());
        assert_eq!(draft.reference, "SO042");
        assert_eq!(draft.payable_id, 42);
        assert_eq!(draft.partner_id, 7);
        assert_eq!(draft.amount, Money::brl(1990));
        assert_eq!(draft.payment_mode_id, 3);
        assert_eq!(draft.acquirer_id, 2);
        assert!(draft.payment_token_id.is_none());
    }

    #[test]
    fn test_acquirer_keys_are_merged() {
        let draft = prepare(&payable(1990), &mode())
            .token(&token())
            .tx_id("a1b2c3")
            .payment_method(PaymentMethod::Pix);
        assert_eq!(draft.ensure_complete().unwrap(), 9);
        assert_eq!(draft.tx_id.as_deref(), Some("a1b2c3"));
        assert_eq!(draft.payment_method, Some(PaymentMethod::Pix));
    }

    #[test]
    fn test_incomplete_drafts_are_rejected() {
        assert!(prepare(&payable(1990), &mode()).ensure_complete().is_err());
        assert!(prepare(&payable(0), &mode()).token(&token()).ensure_complete().is_err());

        let mut blank = payable(1990);
        blank.reference = " ".into();
        assert!(prepare(&blank, &mode()).token(&token()).ensure_complete().is_err());
    }
}
