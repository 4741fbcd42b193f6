//! Error taxonomy for ledger operations.
//!
//! The dispatcher decides what to do with a failed transition *per order
//! status*, so every error here is classified into one of three
//! [`FailureKind`]s rather than collapsed into a single failure type:
//!
//! - **business** failures (insufficient funds, malformed totals) are
//!   expected outcomes, not defects; on the new-order path they become a
//!   `Reject` answer,
//! - **not-found** is fatal to the current operation and never retried
//!   automatically,
//! - **infrastructure** failures must surface loudly on every path, since
//!   silently dropping them risks permanent ledger drift under
//!   at-least-once delivery.

use crate::customer::{CustomerId, Money};
use crate::order::OrderId;
use thiserror::Error;

/// Classification of a [`LedgerError`], used by the dispatcher to pick a
/// per-status failure policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Expected business outcome (insufficient balance, malformed total)
    Business,
    /// The referenced customer does not exist
    NotFound,
    /// The ledger store could not process the request at all
    Infrastructure,
}

/// Errors produced by reservation operations against the ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The referenced customer does not exist.
    #[error("There is no customer with id = {customer_id}")]
    CustomerNotFound {
        /// The missing customer
        customer_id: CustomerId,
    },

    /// The customer's available balance cannot cover the order total.
    #[error(
        "Customer {customer_id} has not enough available balance to pay for order {order_id} \
         (short by {shortfall})"
    )]
    InsufficientAvailableBalance {
        /// The customer whose reservation was refused
        customer_id: CustomerId,
        /// The order that requested the reservation
        order_id: OrderId,
        /// How much was missing
        shortfall: Money,
    },

    /// The customer's reserved balance cannot cover the order total.
    #[error(
        "Customer {customer_id} has not enough reserved balance for order {order_id} \
         (short by {shortfall})"
    )]
    InsufficientReservedBalance {
        /// The customer whose transition was refused
        customer_id: CustomerId,
        /// The order that requested the transition
        order_id: OrderId,
        /// How much was missing
        shortfall: Money,
    },

    /// The order total is zero or negative.
    ///
    /// Totals arrive over the wire as raw signed cents, so this is checked
    /// before any balance math; a negative amount would otherwise mint
    /// reserved funds out of nothing.
    #[error("Order {order_id} carries a non-positive total ({amount})")]
    NonPositiveAmount {
        /// The order carrying the bad total
        order_id: OrderId,
        /// The offending total
        amount: Money,
    },

    /// Applying the transition would push a balance past the representable
    /// range of 64-bit cents.
    #[error("Balance of customer {customer_id} cannot absorb order {order_id} without overflowing")]
    BalanceOverflow {
        /// The customer whose balance would overflow
        customer_id: CustomerId,
        /// The order that requested the transition
        order_id: OrderId,
    },

    /// The ledger store failed for a reason unrelated to business rules.
    #[error("Ledger storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Classifies this error for the dispatcher's failure policy.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::CustomerNotFound { .. } => FailureKind::NotFound,
            Self::InsufficientAvailableBalance { .. }
            | Self::InsufficientReservedBalance { .. }
            | Self::NonPositiveAmount { .. }
            | Self::BalanceOverflow { .. } => FailureKind::Business,
            Self::Storage(_) => FailureKind::Infrastructure,
        }
    }

    /// True for expected business outcomes that are not defects.
    #[must_use]
    pub const fn is_business(&self) -> bool {
        matches!(self.kind(), FailureKind::Business)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_matches_taxonomy() {
        let not_found = LedgerError::CustomerNotFound {
            customer_id: CustomerId::new(1),
        };
        assert_eq!(not_found.kind(), FailureKind::NotFound);

        let business = LedgerError::InsufficientAvailableBalance {
            customer_id: CustomerId::new(1),
            order_id: OrderId::new(),
            shortfall: Money::from_cents(100),
        };
        assert_eq!(business.kind(), FailureKind::Business);
        assert!(business.is_business());

        let bad_amount = LedgerError::NonPositiveAmount {
            order_id: OrderId::new(),
            amount: Money::from_cents(-100),
        };
        assert_eq!(bad_amount.kind(), FailureKind::Business);

        let overflow = LedgerError::BalanceOverflow {
            customer_id: CustomerId::new(1),
            order_id: OrderId::new(),
        };
        assert_eq!(overflow.kind(), FailureKind::Business);

        let infra = LedgerError::Storage("connection refused".to_string());
        assert_eq!(infra.kind(), FailureKind::Infrastructure);
        assert!(!infra.is_business());
    }

    #[test]
    fn insufficient_balance_message_mentions_ids_and_shortfall() {
        let err = LedgerError::InsufficientAvailableBalance {
            customer_id: CustomerId::new(7),
            order_id: OrderId::new(),
            shortfall: Money::from_cents(100),
        };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains("$1.00"));
    }
}
