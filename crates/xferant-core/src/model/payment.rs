use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::DEFAULT_CURRENCY;
use crate::validate::{self, FieldError, Validate, string_enum};

string_enum! {
    /// Payment state. `Completed` and `Failed` are terminal.
    PaymentStatus ("status") {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
    }
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Only `pending -> completed` and `pending -> failed` are allowed.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        self == Self::Pending && next.is_terminal()
    }
}

/// A charge against a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub user_id: String,
    /// Amount in minor currency units (kopecks, cents).
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    /// Identifier assigned by the payment provider, unique once set.
    pub external_payment_id: Option<String>,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    /// Set when the payment reaches a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for initiating a charge. Payments always start `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub user_id: String,
    pub amount: i64,
    pub currency: String,
    pub provider: String,
    pub external_payment_id: Option<String>,
}

impl NewPayment {
    pub fn new(user_id: impl Into<String>, amount: i64, provider: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            provider: provider.into(),
            external_payment_id: None,
        }
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn external_payment_id(mut self, id: impl Into<String>) -> Self {
        self.external_payment_id = Some(id.into());
        self
    }
}

impl Validate for NewPayment {
    fn validate(&self) -> Result<(), FieldError> {
        validate::non_empty("user_id", &self.user_id)?;
        if self.amount <= 0 {
            return Err(FieldError::new("amount", "must be > 0"));
        }
        validate::currency("currency", &self.currency)?;
        validate::non_empty("provider", &self.provider)?;
        if let Some(ext) = &self.external_payment_id {
            validate::non_empty("external_payment_id", ext)?;
        }
        Ok(())
    }
}

/// Changes to a payment.
///
/// Setting `status` finalizes the payment; the store applies it only while
/// the payment is still pending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentPatch {
    pub status: Option<PaymentStatus>,
    pub external_payment_id: Option<String>,
}

impl Validate for PaymentPatch {
    fn validate(&self) -> Result<(), FieldError> {
        if self.status == Some(PaymentStatus::Pending) {
            return Err(FieldError::new("status", "cannot move back to pending"));
        }
        if let Some(ext) = &self.external_payment_id {
            validate::non_empty("external_payment_id", ext)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub user_id: Option<String>,
    pub status: Option<PaymentStatus>,
    pub provider: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        use PaymentStatus::*;
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Pending));
    }

    #[test]
    fn amount_must_be_positive() {
        NewPayment::new("u1", 19900, "yookassa").validate().unwrap();
        assert_eq!(
            NewPayment::new("u1", 0, "yookassa")
                .validate()
                .unwrap_err()
                .field,
            "amount"
        );
        assert_eq!(
            NewPayment::new("u1", -100, "yookassa")
                .validate()
                .unwrap_err()
                .field,
            "amount"
        );
    }

    #[test]
    fn currency_and_provider() {
        let p = NewPayment::new("u1", 100, "cloudpayments").currency("usd");
        assert_eq!(p.validate().unwrap_err().field, "currency");
        let p = NewPayment::new("u1", 100, " ");
        assert_eq!(p.validate().unwrap_err().field, "provider");
        assert_eq!(NewPayment::new("u1", 100, "x").currency, "RUB");
    }

    #[test]
    fn patch_cannot_reopen() {
        let patch = PaymentPatch {
            status: Some(PaymentStatus::Pending),
            ..Default::default()
        };
        assert_eq!(patch.validate().unwrap_err().field, "status");
    }
}
