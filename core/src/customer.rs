//! The customer ledger row and its value types.

use serde::{Deserialize, Serialize};

/// Unique identifier for a customer.
///
/// The upstream system assigns numeric customer identities, so this is a
/// newtype over `i64` rather than a UUID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(i64);

impl CustomerId {
    /// Creates a `CustomerId` from a raw numeric identity
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric identity
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Money amount in cents (avoids floating point issues).
///
/// Committed balances are never negative; that is enforced by the validation
/// in [`crate::balance`], not by this type. Amounts are signed so that
/// shortfalls can be computed without wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a new `Money` amount from cents
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Creates a `Money` amount from whole dollars, saturating at the
    /// representable bounds
    #[must_use]
    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars.saturating_mul(100))
    }

    /// Checks if this amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if this amount is strictly positive
    #[must_use]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Adds another amount, saturating at the representable bounds.
    ///
    /// Mutation paths that must notice the bound use [`Self::checked_plus`]
    /// instead; this form is for display math (totals, shortfalls) where
    /// clamping beats wrapping or panicking.
    #[must_use]
    pub const fn plus(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts another amount, saturating at the representable bounds
    #[must_use]
    pub const fn minus(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Adds another amount, or `None` when the sum is not representable
    #[must_use]
    pub const fn checked_plus(&self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

/// A customer ledger row: the unit of consistency for the whole service.
///
/// Invariants at every committed state:
///
/// - I1: `available >= 0` and `reserved >= 0`
/// - I2: `available + reserved` changes only through create/update
///   (administrative top-up) or a confirm (funds leave the system); reserve
///   and rollback are sum-preserving transfers between the two fields.
///
/// Rows are created once, mutated only by the reservation engine inside a
/// store transaction, and never deleted while referenced by an open
/// reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Customer identifier, immutable after creation
    pub id: CustomerId,
    /// Customer display name; never read by the reservation path
    pub name: String,
    /// Funds free to reserve
    pub available: Money,
    /// Funds earmarked for in-flight orders
    pub reserved: Money,
}

impl Customer {
    /// Creates a new ledger row with the supplied initial balances
    #[must_use]
    pub const fn new(id: CustomerId, name: String, available: Money, reserved: Money) -> Self {
        Self {
            id,
            name,
            available,
            reserved,
        }
    }

    /// Total funds currently tracked for this customer
    #[must_use]
    pub const fn total(&self) -> Money {
        self.available.plus(self.reserved)
    }

    /// Field-level validation for administrative create/update paths.
    ///
    /// # Errors
    ///
    /// Returns one message per violated field: blank name or a negative
    /// balance. The reservation path never needs this; its transitions are
    /// validated against the current row instead.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push("Customer name must not be blank".to_string());
        }
        if self.available.cents() < 0 {
            violations.push("Customer available balance must be positive or zero".to_string());
        }
        if self.reserved.cents() < 0 {
            violations.push("Customer reserved balance must be positive or zero".to_string());
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

impl std::fmt::Display for Customer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Customer(id={}, name={}, available={}, reserved={})",
            self.id, self.name, self.available, self.reserved
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_display_renders_dollars_and_cents() {
        assert_eq!(Money::from_cents(123_45).to_string(), "$123.45");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_dollars(10).to_string(), "$10.00");
    }

    #[test]
    fn money_arithmetic_saturates_instead_of_wrapping() {
        let near_max = Money::from_cents(i64::MAX - 10);
        assert_eq!(near_max.plus(Money::from_cents(100)).cents(), i64::MAX);
        assert_eq!(
            Money::from_cents(i64::MIN + 10)
                .minus(Money::from_cents(100))
                .cents(),
            i64::MIN
        );
        assert_eq!(Money::from_dollars(i64::MAX).cents(), i64::MAX);
    }

    #[test]
    fn checked_plus_refuses_unrepresentable_sums() {
        let near_max = Money::from_cents(i64::MAX - 10);
        assert_eq!(near_max.checked_plus(Money::from_cents(10)), Some(Money::from_cents(i64::MAX)));
        assert_eq!(near_max.checked_plus(Money::from_cents(100)), None);
    }

    #[test]
    fn total_is_sum_of_both_balances() {
        let customer = Customer::new(
            CustomerId::new(1),
            "Alice".to_string(),
            Money::from_cents(800),
            Money::from_cents(200),
        );
        assert_eq!(customer.total(), Money::from_cents(1000));
    }

    #[test]
    fn validate_rejects_blank_name_and_negative_balances() {
        let customer = Customer::new(
            CustomerId::new(1),
            "  ".to_string(),
            Money::from_cents(-1),
            Money::ZERO,
        );
        let violations = customer.validate().unwrap_err();
        assert_eq!(violations.len(), 2);
        assert!(violations[0].contains("name"));
        assert!(violations[1].contains("available"));
    }

    #[test]
    fn validate_accepts_zero_balances() {
        let customer = Customer::new(
            CustomerId::new(1),
            "Alice".to_string(),
            Money::ZERO,
            Money::ZERO,
        );
        assert!(customer.validate().is_ok());
    }
}
