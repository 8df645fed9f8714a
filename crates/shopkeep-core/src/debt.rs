//! # Debt Rules
//!
//! A debt's status is never stored independently of its amounts; it is
//! derived from how much has been paid:
//!
//! ```text
//!   paid == 0              → pending
//!   0 < paid < total       → partial
//!   paid >= total          → paid
//! ```

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::DebtStatus;
use crate::validation::validate_positive;

/// Derives the status for a debt with the given amounts.
pub fn derive_status(total: Money, paid: Money) -> DebtStatus {
    if paid >= total {
        DebtStatus::Paid
    } else if paid.is_positive() {
        DebtStatus::Partial
    } else {
        DebtStatus::Pending
    }
}

/// The money state of one debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebtBalance {
    pub total: Money,
    pub paid: Money,
}

impl DebtBalance {
    pub fn new(total: Money, paid: Money) -> Self {
        DebtBalance { total, paid }
    }

    /// total − paid, never below zero.
    pub fn remaining(&self) -> Money {
        (self.total - self.paid).floor_zero()
    }

    pub fn status(&self) -> DebtStatus {
        derive_status(self.total, self.paid)
    }

    /// Returns the balance after applying `amount`.
    ///
    /// ## Errors
    /// - `Validation(MustBePositive)` if amount <= 0
    /// - `PaymentExceedsBalance` if amount > remaining
    pub fn apply_payment(&self, amount: Money) -> CoreResult<DebtBalance> {
        validate_positive("amount", amount.amount())?;
        let remaining = self.remaining();
        if amount > remaining {
            return Err(CoreError::PaymentExceedsBalance {
                amount: amount.amount(),
                remaining: remaining.amount(),
            });
        }
        Ok(DebtBalance {
            total: self.total,
            paid: self.paid + amount,
        })
    }
}

/// Due date given to a debt created without one.
pub fn default_due_date(now: DateTime<Utc>, term_days: i64) -> DateTime<Utc> {
    now + Duration::days(term_days)
}

/// Description given to a debt created from a checkout.
pub fn order_debt_description(order_number: &str) -> String {
    format!("Công nợ từ đơn hàng #{}", order_number)
}

// =============================================================================
// Unit Tests
// =============================================================================
