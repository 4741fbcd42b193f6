//! Messaging boundary for order events.
//!
//! The bus delivers inbound order events and accepts the outbound
//! accept/reject answers. It offers no ordering or delivery guarantee
//! beyond its own configuration: delivery is at-least-once and unordered
//! across customers, so the ledger side must tolerate duplicates.
//!
//! Implementations: `RedpandaOrderBus` (production, Kafka-compatible) and
//! `RecordingOrderBus` (tests, in the testing crate).

use crate::order::Order;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during bus operations.
#[derive(Error, Debug, Clone)]
pub enum BusError {
    /// Failed to connect to the broker
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to publish an order to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to subscribe to topics
    #[error("Subscription failed for topics {topics:?}: {reason}")]
    SubscriptionFailed {
        /// The topics that failed to subscribe
        topics: Vec<String>,
        /// The reason for failure
        reason: String,
    },

    /// An inbound payload could not be decoded into an order
    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    /// Network or transport error
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Stream of inbound order events.
///
/// Each item is a `Result`: decode and transport problems surface in-band
/// so a consumer can log them and keep reading.
pub type OrderStream = Pin<Box<dyn Stream<Item = Result<Order, BusError>> + Send>>;

/// Boxed future returned by bus operations.
pub type BusFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BusError>> + Send + 'a>>;

/// Publish/subscribe boundary for order events.
///
/// All implementations must be `Send + Sync`; the dispatcher publishes from
/// concurrent workers.
pub trait OrderBus: Send + Sync {
    /// Publish an order event to a topic.
    ///
    /// Messages are keyed by order id, matching the upstream channel
    /// contract (and meaning events for one *customer* may land on
    /// different partitions).
    fn publish(&self, topic: &str, order: &Order) -> BusFuture<'_, ()>;

    /// Subscribe to one or more topics and stream inbound orders.
    fn subscribe(&self, topics: &[&str]) -> BusFuture<'_, OrderStream>;
}
