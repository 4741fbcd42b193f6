//! Pure balance validation and the transition function.
//!
//! Everything in this module is side-effect free: predicates check whether a
//! requested transition is legal given the current row, and [`apply`] runs
//! validate-then-mutate in memory. The store executes [`apply`] inside its
//! row transaction so the check and the mutation are one atomic unit; on a
//! validation failure the row is left byte-for-byte unchanged.

use crate::customer::{Customer, CustomerId, Money};
use crate::error::LedgerError;
use crate::order::OrderId;

/// A validated balance mutation, the only vocabulary the store understands.
///
/// Each variant carries the order identity purely for error context and
/// logging; the ledger keeps no per-order state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalanceTransition {
    /// Move `amount` from available to reserved
    Reserve {
        /// The order requesting the reservation
        order_id: OrderId,
        /// The order total
        amount: Money,
    },
    /// Move `amount` from reserved back to available
    Rollback {
        /// The order being compensated
        order_id: OrderId,
        /// The order total
        amount: Money,
    },
    /// Remove `amount` from reserved; funds leave the ledger entirely
    Confirm {
        /// The order being finalized
        order_id: OrderId,
        /// The order total
        amount: Money,
    },
}

impl BalanceTransition {
    /// The order this transition belongs to
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        match self {
            Self::Reserve { order_id, .. }
            | Self::Rollback { order_id, .. }
            | Self::Confirm { order_id, .. } => *order_id,
        }
    }

    /// The amount this transition moves
    #[must_use]
    pub const fn amount(&self) -> Money {
        match self {
            Self::Reserve { amount, .. }
            | Self::Rollback { amount, .. }
            | Self::Confirm { amount, .. } => *amount,
        }
    }
}

impl std::fmt::Display for BalanceTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reserve { order_id, amount } => {
                write!(f, "reserve {amount} for order {order_id}")
            }
            Self::Rollback { order_id, amount } => {
                write!(f, "rollback {amount} for order {order_id}")
            }
            Self::Confirm { order_id, amount } => {
                write!(f, "confirm {amount} for order {order_id}")
            }
        }
    }
}

/// Rejects zero and negative amounts before any balance comparison.
///
/// Totals come straight off the wire as signed cents. A negative amount
/// would make every `>=` cover check trivially true and move funds in the
/// wrong direction, so no validator runs without this guard.
fn check_amount(order_id: OrderId, amount: Money) -> Result<(), LedgerError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::NonPositiveAmount { order_id, amount })
    }
}

/// Checks that `amount` is positive and the customer's available balance
/// covers it.
///
/// # Errors
///
/// Returns [`LedgerError::NonPositiveAmount`] for a zero or negative
/// amount, [`LedgerError::InsufficientAvailableBalance`] with the exact
/// shortfall when the balance cannot cover it.
pub fn can_reserve(
    customer: &Customer,
    order_id: OrderId,
    amount: Money,
) -> Result<(), LedgerError> {
    check_amount(order_id, amount)?;
    if customer.available >= amount {
        Ok(())
    } else {
        Err(LedgerError::InsufficientAvailableBalance {
            customer_id: customer.id,
            order_id,
            shortfall: amount.minus(customer.available),
        })
    }
}

/// Checks that `amount` is positive and the customer's reserved balance
/// covers it.
///
/// # Errors
///
/// Returns [`LedgerError::NonPositiveAmount`] for a zero or negative
/// amount, [`LedgerError::InsufficientReservedBalance`] with the exact
/// shortfall when the balance cannot cover it.
pub fn can_rollback(
    customer: &Customer,
    order_id: OrderId,
    amount: Money,
) -> Result<(), LedgerError> {
    check_reserved(customer, order_id, amount)
}

/// Checks that `amount` is positive and the customer's reserved balance
/// covers it.
///
/// # Errors
///
/// Returns [`LedgerError::NonPositiveAmount`] for a zero or negative
/// amount, [`LedgerError::InsufficientReservedBalance`] with the exact
/// shortfall when the balance cannot cover it.
pub fn can_confirm(
    customer: &Customer,
    order_id: OrderId,
    amount: Money,
) -> Result<(), LedgerError> {
    check_reserved(customer, order_id, amount)
}

fn check_reserved(
    customer: &Customer,
    order_id: OrderId,
    amount: Money,
) -> Result<(), LedgerError> {
    check_amount(order_id, amount)?;
    if customer.reserved >= amount {
        Ok(())
    } else {
        Err(LedgerError::InsufficientReservedBalance {
            customer_id: customer.id,
            order_id,
            shortfall: amount.minus(customer.reserved),
        })
    }
}

/// Validates and applies a transition to the row, in memory.
///
/// Must run inside the store transaction that loaded `customer`; reading
/// balances outside the transaction that later mutates them would let two
/// concurrent reservations both pass validation against a stale snapshot.
///
/// # Errors
///
/// Returns the validator's error unchanged and leaves `customer` untouched
/// when the transition is not legal.
pub fn apply(customer: &mut Customer, transition: &BalanceTransition) -> Result<(), LedgerError> {
    match *transition {
        BalanceTransition::Reserve { order_id, amount } => {
            can_reserve(customer, order_id, amount)?;
            // Checked before either field moves, so a refused transition
            // leaves the row untouched.
            let reserved = customer.reserved.checked_plus(amount).ok_or(
                LedgerError::BalanceOverflow {
                    customer_id: customer.id,
                    order_id,
                },
            )?;
            customer.available = customer.available.minus(amount);
            customer.reserved = reserved;
        }
        BalanceTransition::Rollback { order_id, amount } => {
            can_rollback(customer, order_id, amount)?;
            let available = customer.available.checked_plus(amount).ok_or(
                LedgerError::BalanceOverflow {
                    customer_id: customer.id,
                    order_id,
                },
            )?;
            customer.reserved = customer.reserved.minus(amount);
            customer.available = available;
        }
        BalanceTransition::Confirm { order_id, amount } => {
            can_confirm(customer, order_id, amount)?;
            customer.reserved = customer.reserved.minus(amount);
        }
    }
    Ok(())
}

/// Convenience for loading a row that may be absent.
///
/// # Errors
///
/// Returns [`LedgerError::CustomerNotFound`] when `customer` is `None`.
pub fn require_customer(
    customer: Option<Customer>,
    customer_id: CustomerId,
) -> Result<Customer, LedgerError> {
    customer.ok_or(LedgerError::CustomerNotFound { customer_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(available: i64, reserved: i64) -> Customer {
        Customer::new(
            CustomerId::new(1),
            "Alice".to_string(),
            Money::from_cents(available),
            Money::from_cents(reserved),
        )
    }

    #[test]
    fn reserve_moves_funds_between_fields() {
        let mut c = customer(1000, 0);
        let t = BalanceTransition::Reserve {
            order_id: OrderId::new(),
            amount: Money::from_cents(200),
        };
        apply(&mut c, &t).unwrap();
        assert_eq!(c.available, Money::from_cents(800));
        assert_eq!(c.reserved, Money::from_cents(200));
    }

    #[test]
    fn reserve_rejection_reports_shortfall_and_leaves_row_unchanged() {
        let mut c = customer(100, 0);
        let before = c.clone();
        let t = BalanceTransition::Reserve {
            order_id: OrderId::new(),
            amount: Money::from_cents(200),
        };
        let err = apply(&mut c, &t).unwrap_err();
        match err {
            LedgerError::InsufficientAvailableBalance { shortfall, .. } => {
                assert_eq!(shortfall, Money::from_cents(100));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(c, before);
    }

    #[test]
    fn rollback_is_the_inverse_of_reserve() {
        let mut c = customer(800, 200);
        let t = BalanceTransition::Rollback {
            order_id: OrderId::new(),
            amount: Money::from_cents(200),
        };
        apply(&mut c, &t).unwrap();
        assert_eq!(c.available, Money::from_cents(1000));
        assert_eq!(c.reserved, Money::ZERO);
    }

    #[test]
    fn confirm_removes_funds_from_the_ledger_only() {
        let mut c = customer(800, 200);
        let t = BalanceTransition::Confirm {
            order_id: OrderId::new(),
            amount: Money::from_cents(200),
        };
        apply(&mut c, &t).unwrap();
        assert_eq!(c.available, Money::from_cents(800));
        assert_eq!(c.reserved, Money::ZERO);
    }

    #[test]
    fn confirm_rejection_leaves_row_unchanged() {
        let mut c = customer(800, 100);
        let before = c.clone();
        let t = BalanceTransition::Confirm {
            order_id: OrderId::new(),
            amount: Money::from_cents(200),
        };
        let err = apply(&mut c, &t).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientReservedBalance { .. }
        ));
        assert_eq!(c, before);
    }

    #[test]
    fn exact_balance_is_sufficient() {
        let mut c = customer(200, 0);
        let t = BalanceTransition::Reserve {
            order_id: OrderId::new(),
            amount: Money::from_cents(200),
        };
        apply(&mut c, &t).unwrap();
        assert_eq!(c.available, Money::ZERO);
        assert_eq!(c.reserved, Money::from_cents(200));
    }

    #[test]
    fn negative_rollback_cannot_mint_reserved_funds() {
        let mut c = customer(100, 0);
        let before = c.clone();
        let t = BalanceTransition::Rollback {
            order_id: OrderId::new(),
            amount: Money::from_cents(-500),
        };
        let err = apply(&mut c, &t).unwrap_err();
        assert!(matches!(err, LedgerError::NonPositiveAmount { .. }));
        assert_eq!(c, before);
    }

    #[test]
    fn zero_amount_is_rejected_on_every_transition() {
        let mut c = customer(1000, 500);
        let before = c.clone();
        let order_id = OrderId::new();
        let amount = Money::ZERO;
        for t in [
            BalanceTransition::Reserve { order_id, amount },
            BalanceTransition::Rollback { order_id, amount },
            BalanceTransition::Confirm { order_id, amount },
        ] {
            let err = apply(&mut c, &t).unwrap_err();
            assert!(matches!(err, LedgerError::NonPositiveAmount { .. }));
            assert_eq!(c, before);
        }
    }

    #[test]
    fn reserve_into_a_full_reserved_balance_is_refused_without_mutation() {
        let mut c = customer(100, i64::MAX - 10);
        let before = c.clone();
        let t = BalanceTransition::Reserve {
            order_id: OrderId::new(),
            amount: Money::from_cents(100),
        };
        let err = apply(&mut c, &t).unwrap_err();
        assert!(matches!(err, LedgerError::BalanceOverflow { .. }));
        assert_eq!(c, before);
    }

    #[test]
    fn rollback_into_a_full_available_balance_is_refused_without_mutation() {
        let mut c = customer(i64::MAX - 10, 100);
        let before = c.clone();
        let t = BalanceTransition::Rollback {
            order_id: OrderId::new(),
            amount: Money::from_cents(100),
        };
        let err = apply(&mut c, &t).unwrap_err();
        assert!(matches!(err, LedgerError::BalanceOverflow { .. }));
        assert_eq!(c, before);
    }

    #[test]
    fn require_customer_maps_absence_to_not_found() {
        let err = require_customer(None, CustomerId::new(9)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::CustomerNotFound {
                customer_id: CustomerId::new(9)
            }
        );
    }
}
