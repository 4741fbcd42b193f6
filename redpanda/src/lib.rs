//! Redpanda order bus implementation for the payment ledger.
//!
//! Implements the [`OrderBus`] trait over rdkafka, so any Kafka-compatible
//! broker (Redpanda, Apache Kafka, MSK, ...) can carry the order channel.
//!
//! # Delivery semantics
//!
//! **At-least-once** with manual offset commits:
//! - Offsets are committed only AFTER an event has been handed to the
//!   subscriber's channel; a crash before commit means redelivery.
//! - The ledger side is therefore exposed to duplicates and must decide
//!   what to do with them (it currently does not deduplicate; see the
//!   service crate's regression tests).
//! - Messages are keyed by **order id**, matching the upstream channel
//!   contract. Ordering is per partition, so two orders for the same
//!   customer may be processed concurrently.
//!
//! # Example
//!
//! ```no_run
//! use payment_ledger_redpanda::RedpandaOrderBus;
//! use payment_ledger_core::bus::OrderBus;
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = RedpandaOrderBus::builder()
//!     .brokers("localhost:9092")
//!     .consumer_group("payment")
//!     .build()?;
//!
//! let mut stream = bus.subscribe(&["orders"]).await?;
//! while let Some(result) = stream.next().await {
//!     match result {
//!         Ok(order) => println!("Received order {}", order.id),
//!         Err(e) => eprintln!("Error: {e}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use payment_ledger_core::bus::{BusError, BusFuture, OrderBus, OrderStream};
use payment_ledger_core::Order;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;

/// Kafka-compatible [`OrderBus`].
///
/// Configured through [`RedpandaOrderBusBuilder`]: broker addresses,
/// producer acks/compression/timeout, consumer group, subscriber buffer
/// size and offset reset policy.
pub struct RedpandaOrderBus {
    /// Kafka producer for publishing order events
    producer: FutureProducer,
    /// Broker addresses (for creating consumers)
    brokers: String,
    /// Producer timeout
    timeout: Duration,
    /// Consumer group ID (if explicitly set)
    consumer_group: Option<String>,
    /// Event buffer size for subscribers
    buffer_size: usize,
    /// Auto offset reset policy
    auto_offset_reset: String,
}

impl RedpandaOrderBus {
    /// Create a bus with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::ConnectionFailed`] if the producer cannot be
    /// created for the given broker list.
    pub fn new(brokers: &str) -> Result<Self, BusError> {
        Self::builder().brokers(brokers).build()
    }

    /// Create a new builder for configuring the bus.
    #[must_use]
    pub fn builder() -> RedpandaOrderBusBuilder {
        RedpandaOrderBusBuilder::default()
    }

    /// Get a reference to the brokers string.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }
}

/// Builder for configuring a [`RedpandaOrderBus`].
#[derive(Default)]
pub struct RedpandaOrderBusBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    timeout: Option<Duration>,
    consumer_group: Option<String>,
    buffer_size: Option<usize>,
    auto_offset_reset: Option<String>,
}

impl RedpandaOrderBusBuilder {
    /// Set the broker addresses (comma-separated).
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set the producer acknowledgment mode: "0", "1" or "all".
    ///
    /// Default: "1"
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Set the compression codec: "none", "gzip", "snappy", "lz4", "zstd".
    ///
    /// Default: "none"
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Set the producer send timeout.
    ///
    /// Default: 5 seconds
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the consumer group ID for subscriptions.
    ///
    /// If not set, the group is generated from the sorted topic names.
    /// Setting it explicitly lets multiple service instances share the
    /// partition workload.
    #[must_use]
    pub fn consumer_group(mut self, consumer_group: impl Into<String>) -> Self {
        self.consumer_group = Some(consumer_group.into());
        self
    }

    /// Set the event buffer size between the consumer and the subscriber.
    ///
    /// Default: 1000
    ///
    /// # Panics
    ///
    /// Panics if `buffer_size` is 0.
    #[must_use]
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        assert!(buffer_size > 0, "buffer_size must be greater than 0");
        self.buffer_size = Some(buffer_size);
        self
    }

    /// Set where new consumer groups start reading: "earliest", "latest"
    /// or "error".
    ///
    /// Default: "latest"
    #[must_use]
    pub fn auto_offset_reset(mut self, policy: impl Into<String>) -> Self {
        self.auto_offset_reset = Some(policy.into());
        self
    }

    /// Build the [`RedpandaOrderBus`].
    ///
    /// # Errors
    ///
    /// Returns [`BusError::ConnectionFailed`] if brokers are not set or the
    /// producer cannot be created.
    pub fn build(self) -> Result<RedpandaOrderBus, BusError> {
        let brokers = self
            .brokers
            .ok_or_else(|| BusError::ConnectionFailed("Brokers not configured".to_string()))?;

        let mut producer_config = ClientConfig::new();
        producer_config
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", self.producer_acks.as_deref().unwrap_or("1"))
            .set(
                "compression.type",
                self.compression.as_deref().unwrap_or("none"),
            );

        let producer: FutureProducer = producer_config
            .create()
            .map_err(|e| BusError::ConnectionFailed(format!("Failed to create producer: {e}")))?;

        tracing::info!(
            brokers = %brokers,
            acks = self.producer_acks.as_deref().unwrap_or("1"),
            compression = self.compression.as_deref().unwrap_or("none"),
            buffer_size = self.buffer_size.unwrap_or(1000),
            auto_offset_reset = self.auto_offset_reset.as_deref().unwrap_or("latest"),
            "RedpandaOrderBus created successfully"
        );

        Ok(RedpandaOrderBus {
            producer,
            brokers,
            timeout: self.timeout.unwrap_or(Duration::from_secs(5)),
            consumer_group: self.consumer_group,
            buffer_size: self.buffer_size.unwrap_or(1000),
            auto_offset_reset: self
                .auto_offset_reset
                .unwrap_or_else(|| "latest".to_string()),
        })
    }
}

impl OrderBus for RedpandaOrderBus {
    fn publish(&self, topic: &str, order: &Order) -> BusFuture<'_, ()> {
        // Clone data before moving into the async block
        let topic = topic.to_string();
        let order = order.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let payload = order.to_bytes().map_err(|e| BusError::PublishFailed {
                topic: topic.clone(),
                reason: format!("Failed to encode order: {e}"),
            })?;

            // Key by order id: the upstream channel contract. Events for
            // one customer may land on different partitions.
            let key = order.id.to_string();

            let record = FutureRecord::to(&topic).payload(&payload).key(&key);

            let send_result = self.producer.send(record, Timeout::After(timeout)).await;

            match send_result {
                Ok((partition, offset)) => {
                    tracing::debug!(
                        topic = %topic,
                        partition = partition,
                        offset = offset,
                        order_id = %order.id,
                        status = %order.status,
                        "Order published successfully"
                    );
                    Ok(())
                }
                Err((kafka_error, _)) => {
                    tracing::error!(
                        topic = %topic,
                        order_id = %order.id,
                        error = %kafka_error,
                        "Failed to publish order"
                    );
                    Err(BusError::PublishFailed {
                        topic,
                        reason: kafka_error.to_string(),
                    })
                }
            }
        })
    }

    fn subscribe(&self, topics: &[&str]) -> BusFuture<'_, OrderStream> {
        // Clone configuration before moving into the async block
        let topics: Vec<String> = topics.iter().map(|s| (*s).to_string()).collect();
        let brokers = self.brokers.clone();
        let consumer_group = self.consumer_group.clone();
        let buffer_size = self.buffer_size;
        let auto_offset_reset = self.auto_offset_reset.clone();

        Box::pin(async move {
            let consumer_group_id = if let Some(group) = consumer_group {
                group
            } else {
                let mut sorted_topics = topics.clone();
                sorted_topics.sort();
                format!("payment-ledger-{}", sorted_topics.join("-"))
            };

            // Manual commit for at-least-once delivery
            let consumer: StreamConsumer = ClientConfig::new()
                .set("bootstrap.servers", &brokers)
                .set("group.id", &consumer_group_id)
                .set("enable.auto.commit", "false")
                .set("auto.offset.reset", &auto_offset_reset)
                .set("session.timeout.ms", "6000")
                .set("enable.partition.eof", "false")
                .create()
                .map_err(|e| BusError::SubscriptionFailed {
                    topics: topics.clone(),
                    reason: format!("Failed to create consumer: {e}"),
                })?;

            let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
            consumer
                .subscribe(&topic_refs)
                .map_err(|e| BusError::SubscriptionFailed {
                    topics: topics.clone(),
                    reason: format!("Failed to subscribe to topics: {e}"),
                })?;

            tracing::info!(
                topics = ?topics,
                consumer_group = %consumer_group_id,
                buffer_size = buffer_size,
                auto_offset_reset = %auto_offset_reset,
                manual_commit = true,
                "Subscribed to topics"
            );

            let (tx, rx) = tokio::sync::mpsc::channel(buffer_size);

            // Spawn a task that owns the consumer and forwards orders
            tokio::spawn(async move {
                use futures::StreamExt;
                use rdkafka::consumer::CommitMode;

                let mut stream = consumer.stream();

                while let Some(msg_result) = stream.next().await {
                    match msg_result {
                        Ok(message) => {
                            let order_result = match message.payload() {
                                Some(payload) => {
                                    Order::from_bytes(payload).map_err(|e| {
                                        BusError::DecodeFailed(e.to_string())
                                    })
                                }
                                None => Err(BusError::DecodeFailed(
                                    "Message has no payload".to_string(),
                                )),
                            };

                            if let Ok(order) = &order_result {
                                tracing::trace!(
                                    topic = message.topic(),
                                    partition = message.partition(),
                                    offset = message.offset(),
                                    order_id = %order.id,
                                    status = %order.status,
                                    "Received order"
                                );
                            }

                            // Only commit AFTER successful send to the channel:
                            // a crash before commit means redelivery.
                            if tx.send(order_result).await.is_err() {
                                tracing::debug!("Channel receiver dropped, exiting consumer task");
                                break; // Receiver dropped, exit WITHOUT committing
                            }

                            if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
                                tracing::warn!(
                                    topic = message.topic(),
                                    partition = message.partition(),
                                    offset = message.offset(),
                                    error = %e,
                                    "Failed to commit offset (message may be redelivered)"
                                );
                                // Keep processing; stopping here is worse
                                // than the occasional duplicate.
                            }
                        }
                        Err(e) => {
                            let err =
                                BusError::Transport(format!("Failed to receive message: {e}"));
                            if tx.send(Err(err)).await.is_err() {
                                break; // Receiver dropped
                            }
                        }
                    }
                }

                tracing::debug!("Consumer task exiting");
            });

            let stream = async_stream::stream! {
                let mut rx = rx;
                while let Some(result) = rx.recv().await {
                    yield result;
                }
            };

            Ok(Box::pin(stream) as OrderStream)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redpanda_order_bus_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedpandaOrderBus>();
        assert_sync::<RedpandaOrderBus>();
    }

    #[test]
    fn builder_requires_brokers() {
        let result = RedpandaOrderBus::builder().build();
        assert!(matches!(result, Err(BusError::ConnectionFailed(_))));
    }
}
