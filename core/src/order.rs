//! The order event exchanged with the rest of the saga.
//!
//! Orders are *events*, not stored entities: this service reads the
//! identity, the customer reference, the total price and the requested
//! transition, and on the new-order path answers with the same identity
//! carrying an accept/reject status.
//!
//! # Serialization
//!
//! Events cross the broker as `bincode` payloads for compact, fast framing.
//! The codec lives here so every transport (and every test double) frames
//! orders identically.

use crate::customer::{CustomerId, Money};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error types for the order wire codec.
#[derive(Error, Debug)]
pub enum OrderCodecError {
    /// Failed to serialize an order to bytes.
    #[error("Failed to serialize order: {0}")]
    Serialization(String),

    /// Failed to deserialize an order from bytes.
    #[error("Failed to deserialize order: {0}")]
    Deserialization(String),
}

/// Unique identifier for an order.
///
/// Orders are identified by UUID upstream; the ledger only ever treats it
/// as an opaque key (and as the broker partitioning key).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random `OrderId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an `OrderId` from a UUID
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The transition an order event requests (or reports).
///
/// A closed set: `New`, `Rollback` and `Confirmation` arrive inbound;
/// `Accept` and `Reject` are produced outbound on the new-order path.
/// Matching on this enum is exhaustive, so adding a status is a
/// compile-time-checked change at every dispatch site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// A new order asking for funds to be reserved
    New,
    /// Outbound: the reservation succeeded
    Accept,
    /// Outbound: the reservation was rejected
    Reject,
    /// Compensation: return reserved funds to available
    Rollback,
    /// Finalization: remove reserved funds from the ledger
    Confirmation,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Accept => "ACCEPT",
            Self::Reject => "REJECT",
            Self::Rollback => "ROLLBACK",
            Self::Confirmation => "CONFIRMATION",
        };
        f.write_str(s)
    }
}

/// An order event.
///
/// Read-only to this service apart from `status` and `rejection_reason`,
/// which the dispatcher rewrites when answering on the new-order path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier, unique per order
    pub id: OrderId,
    /// The customer whose balance this order draws on
    pub customer_id: CustomerId,
    /// Total price derived from line items upstream; opaque here
    pub total_price: Money,
    /// The requested (inbound) or resulting (outbound) transition
    pub status: OrderStatus,
    /// Human-readable reason, populated on `Reject` outbound events only
    pub rejection_reason: Option<String>,
}

impl Order {
    /// Creates an inbound order event
    #[must_use]
    pub const fn new(
        id: OrderId,
        customer_id: CustomerId,
        total_price: Money,
        status: OrderStatus,
    ) -> Self {
        Self {
            id,
            customer_id,
            total_price,
            status,
            rejection_reason: None,
        }
    }

    /// The outbound answer for a successful reservation
    #[must_use]
    pub fn accepted(&self) -> Self {
        Self {
            status: OrderStatus::Accept,
            rejection_reason: None,
            ..self.clone()
        }
    }

    /// The outbound answer for a rejected reservation
    #[must_use]
    pub fn rejected(&self, reason: impl Into<String>) -> Self {
        Self {
            status: OrderStatus::Reject,
            rejection_reason: Some(reason.into()),
            ..self.clone()
        }
    }

    /// Serialize this order to bincode bytes for the broker.
    ///
    /// # Errors
    ///
    /// Returns [`OrderCodecError::Serialization`] if encoding fails, which
    /// is rare with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, OrderCodecError> {
        bincode::serialize(self).map_err(|e| OrderCodecError::Serialization(e.to_string()))
    }

    /// Deserialize an order from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`OrderCodecError::Deserialization`] if the payload is not a
    /// valid order, including unrecognized status values. Corrupt payloads
    /// surface as errors, never as panics.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OrderCodecError> {
        bincode::deserialize(bytes).map_err(|e| OrderCodecError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order(status: OrderStatus) -> Order {
        Order::new(
            OrderId::new(),
            CustomerId::new(42),
            Money::from_cents(200),
            status,
        )
    }

    #[test]
    fn codec_round_trips_an_order() {
        let order = sample_order(OrderStatus::New);
        let bytes = order.to_bytes().unwrap();
        let decoded = Order::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, order);
    }

    #[test]
    fn corrupt_payload_is_an_error_not_a_panic() {
        let err = Order::from_bytes(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, OrderCodecError::Deserialization(_)));
    }

    #[test]
    fn accepted_keeps_identity_and_clears_reason() {
        let order = sample_order(OrderStatus::New);
        let accepted = order.accepted();
        assert_eq!(accepted.id, order.id);
        assert_eq!(accepted.customer_id, order.customer_id);
        assert_eq!(accepted.total_price, order.total_price);
        assert_eq!(accepted.status, OrderStatus::Accept);
        assert!(accepted.rejection_reason.is_none());
    }

    #[test]
    fn rejected_carries_a_reason() {
        let order = sample_order(OrderStatus::New);
        let rejected = order.rejected("not enough funds");
        assert_eq!(rejected.status, OrderStatus::Reject);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("not enough funds"));
    }
}
