//! # Checkout Rules
//!
//! Order totals, order status transitions and order numbering.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cart lines ──► validate_cart ──► CheckoutTotals::compute              │
//! │                                         │                               │
//! │          subtotal = Σ price × qty       │                               │
//! │          total    = subtotal − discount │                               │
//! │          change   = max(0, payment − total)   (0 for debt)             │
//! │                                         ▼                               │
//! │                    shopkeep-db: stock decrement + order insert (1 tx)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{OrderStatus, PaymentMethod};
use crate::validation::{validate_non_negative, validate_quantity};
use crate::MAX_CART_ITEMS;

// =============================================================================
// Totals
// =============================================================================

/// One priced cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutLine {
    pub price: Money,
    pub quantity: i64,
}

impl CheckoutLine {
    pub fn new(price: Money, quantity: i64) -> Self {
        CheckoutLine { price, quantity }
    }

    /// price × quantity.
    #[inline]
    pub fn total(&self) -> Money {
        self.price.multiply_quantity(self.quantity)
    }
}

/// Computed money fields of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub customer_payment: Money,
    pub change: Money,
}

impl CheckoutTotals {
    /// Computes totals for the given lines.
    ///
    /// The total is not floored: a discount larger than the subtotal yields
    /// a negative total. Change is never negative, and is always zero for
    /// a debt sale since nothing is handed over.
    pub fn compute(
        lines: &[CheckoutLine],
        discount: Money,
        customer_payment: Money,
        method: PaymentMethod,
    ) -> Self {
        let subtotal: Money = lines.iter().map(CheckoutLine::total).sum();
        let total = subtotal - discount;
        let change = if method.is_debt() {
            Money::zero()
        } else {
            (customer_payment - total).floor_zero()
        };

        CheckoutTotals {
            subtotal,
            discount,
            total,
            customer_payment,
            change,
        }
    }
}

/// Validates cart shape and money inputs before any stock is touched.
pub fn validate_cart(
    lines: &[CheckoutLine],
    discount: Money,
    customer_payment: Money,
) -> CoreResult<()> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }
    if lines.len() > MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }
    for line in lines {
        validate_quantity(line.quantity)?;
        validate_non_negative("price", line.price.amount())?;
    }
    validate_non_negative("discount", discount.amount())?;
    validate_non_negative("customerPayment", customer_payment.amount())?;
    Ok(())
}

// =============================================================================
// Status Transitions
// =============================================================================

/// Outcome of a permitted status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Whether each line's quantity goes back on the shelf.
    pub restores_stock: bool,
}

/// Statuses a caller may request through the status endpoint.
pub const REQUESTABLE_STATUSES: [OrderStatus; 4] = [
    OrderStatus::Pending,
    OrderStatus::Completed,
    OrderStatus::Cancelled,
    OrderStatus::Refunded,
];

/// Plans a status change.
///
/// ## Transition Table
/// ```text
///   COMPLETED ──► CANCELLED   (stock restored)
///   COMPLETED ──► REFUNDED    (stock restored)
///   anything else             InvalidStatusTransition
/// ```
///
/// A second cancel or refund is rejected, so stock can only be restored
/// once per order.
pub fn plan_status_change(from: OrderStatus, to: OrderStatus) -> CoreResult<StatusChange> {
    if !REQUESTABLE_STATUSES.contains(&to) {
        return Err(ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: REQUESTABLE_STATUSES
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        }
        .into());
    }

    match (from, to) {
        (OrderStatus::Completed, OrderStatus::Cancelled | OrderStatus::Refunded) => {
            Ok(StatusChange {
                from,
                to,
                restores_stock: true,
            })
        }
        _ => Err(CoreError::InvalidStatusTransition {
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}

// =============================================================================
// Order Numbers
// =============================================================================

const ORDER_PREFIX: &str = "ORD-";

/// Derives the next order number from the most recent one.
///
/// `ORD-0041` → `ORD-0042`; nothing (or something unparsable) → `ORD-0001`.
/// Numbers keep growing past four digits.
pub fn next_order_number(latest: Option<&str>) -> String {
    let next = latest
        .and_then(|n| n.strip_prefix(ORDER_PREFIX))
        .and_then(|digits| digits.parse::<u64>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);
    format!("{}{:04}", ORDER_PREFIX, next)
}

/// Random order number used when the sequence keeps colliding.
///
/// `seed` is any random value (the caller passes fresh UUID bits).
pub fn fallback_order_number(seed: u128) -> String {
    format!("{}{}", ORDER_PREFIX, 1000 + (seed % 9000))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> Vec<CheckoutLine> {
        vec![
            CheckoutLine::new(Money::new(25_000), 2),
            CheckoutLine::new(Money::new(7_500), 4),
        ]
    }

    #[test]
    fn test_totals_cash() {
        let totals = CheckoutTotals::compute(
            &lines(),
            Money::new(10_000),
            Money::new(100_000),
            PaymentMethod::Cash,
        );
        assert_eq!(totals.subtotal.amount(), 80_000);
        assert_eq!(totals.total.amount(), 70_000);
        assert_eq!(totals.change.amount(), 30_000);
    }

    #[test]
    fn test_totals_underpayment_gives_zero_change() {
        let totals =
            CheckoutTotals::compute(&lines(), Money::zero(), Money::new(1_000), PaymentMethod::Cash);
        assert_eq!(totals.change, Money::zero());
    }

    #[test]
    fn test_totals_debt_has_no_change() {
        let totals = CheckoutTotals::compute(
            &lines(),
            Money::zero(),
            Money::new(500_000),
            PaymentMethod::Debt,
        );
        assert_eq!(totals.total.amount(), 80_000);
        assert_eq!(totals.change, Money::zero());
    }

    #[test]
    fn test_totals_discount_larger_than_subtotal() {
        let totals = CheckoutTotals::compute(
            &lines(),
            Money::new(100_000),
            Money::zero(),
            PaymentMethod::Cash,
        );
        assert_eq!(totals.total.amount(), -20_000);
        assert_eq!(totals.change.amount(), 20_000);
    }

    #[test]
    fn test_validate_cart() {
        assert!(validate_cart(&lines(), Money::zero(), Money::zero()).is_ok());
        assert!(matches!(
            validate_cart(&[], Money::zero(), Money::zero()),
            Err(CoreError::EmptyCart)
        ));
        let bad = [CheckoutLine::new(Money::new(1_000), 0)];
        assert!(matches!(
            validate_cart(&bad, Money::zero(), Money::zero()),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
        assert!(validate_cart(&lines(), Money::new(-1), Money::zero()).is_err());
        let many = vec![CheckoutLine::new(Money::new(1), 1); MAX_CART_ITEMS + 1];
        assert!(matches!(
            validate_cart(&many, Money::zero(), Money::zero()),
            Err(CoreError::CartTooLarge { .. })
        ));
    }

    #[test]
    fn test_completed_can_be_cancelled_or_refunded() {
        let change = plan_status_change(OrderStatus::Completed, OrderStatus::Cancelled).unwrap();
        assert!(change.restores_stock);
        let change = plan_status_change(OrderStatus::Completed, OrderStatus::Refunded).unwrap();
        assert!(change.restores_stock);
    }

    #[test]
    fn test_repeat_cancel_is_rejected() {
        assert!(matches!(
            plan_status_change(OrderStatus::Cancelled, OrderStatus::Cancelled),
            Err(CoreError::InvalidStatusTransition { .. })
        ));
        assert!(plan_status_change(OrderStatus::Refunded, OrderStatus::Cancelled).is_err());
        assert!(plan_status_change(OrderStatus::Cancelled, OrderStatus::Completed).is_err());
        assert!(plan_status_change(OrderStatus::Completed, OrderStatus::Pending).is_err());
    }

    #[test]
    fn test_processing_is_not_requestable() {
        assert!(matches!(
            plan_status_change(OrderStatus::Pending, OrderStatus::Processing),
            Err(CoreError::Validation(ValidationError::NotAllowed { .. }))
        ));
    }

    #[test]
    fn test_next_order_number() {
        assert_eq!(next_order_number(None), "ORD-0001");
        assert_eq!(next_order_number(Some("ORD-0041")), "ORD-0042");
        assert_eq!(next_order_number(Some("ORD-9999")), "ORD-10000");
        assert_eq!(next_order_number(Some("garbage")), "ORD-0001");
    }

    #[test]
    fn test_fallback_order_number_range() {
        for seed in [0u128, 1, 8_999, 9_000, u128::MAX] {
            let n = fallback_order_number(seed);
            let digits: u32 = n.strip_prefix("ORD-").unwrap().parse().unwrap();
            assert!((1000..10_000).contains(&digits));
        }
    }
}
