//! Recording order bus double.

use payment_ledger_core::bus::{BusError, BusFuture, OrderBus, OrderStream};
use payment_ledger_core::Order;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Mutex};

/// In-memory [`OrderBus`] that records every published event and lets
/// tests inject inbound events (or stream errors) into subscribers.
///
/// `fail_publish(true)` makes subsequent publishes fail, for exercising
/// the partial-failure window between a committed ledger mutation and the
/// outbound publish.
#[derive(Debug, Default)]
pub struct RecordingOrderBus {
    published: Mutex<Vec<(String, Order)>>,
    subscribers: Mutex<Vec<mpsc::Sender<Result<Order, BusError>>>>,
    fail_publish: AtomicBool,
}

impl RecordingOrderBus {
    /// Creates an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(topic, order)` published so far, in order
    pub async fn published(&self) -> Vec<(String, Order)> {
        self.published.lock().await.clone()
    }

    /// Orders published to one topic
    pub async fn published_to(&self, topic: &str) -> Vec<Order> {
        self.published
            .lock()
            .await
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, order)| order.clone())
            .collect()
    }

    /// Pushes an inbound order to every subscriber
    pub async fn deliver(&self, order: Order) {
        for tx in self.subscribers.lock().await.iter() {
            let _ = tx.send(Ok(order.clone())).await;
        }
    }

    /// Pushes a stream-level error to every subscriber
    pub async fn deliver_error(&self, error: BusError) {
        for tx in self.subscribers.lock().await.iter() {
            let _ = tx.send(Err(error.clone())).await;
        }
    }

    /// Drops all subscriber channels, ending their streams
    pub async fn close(&self) {
        self.subscribers.lock().await.clear();
    }

    /// Toggles injected publish failures
    pub fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }
}

impl OrderBus for RecordingOrderBus {
    fn publish(&self, topic: &str, order: &Order) -> BusFuture<'_, ()> {
        let topic = topic.to_string();
        let order = order.clone();
        Box::pin(async move {
            if self.fail_publish.load(Ordering::SeqCst) {
                return Err(BusError::PublishFailed {
                    topic,
                    reason: "injected publish failure".to_string(),
                });
            }
            self.published.lock().await.push((topic, order));
            Ok(())
        })
    }

    fn subscribe(&self, _topics: &[&str]) -> BusFuture<'_, OrderStream> {
        Box::pin(async move {
            let (tx, rx) = mpsc::channel(64);
            self.subscribers.lock().await.push(tx);
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
    use futures::StreamExt;
    use payment_ledger_core::{CustomerId, Money, OrderId, OrderStatus};

    fn order() -> Order {
        Order::new(
            OrderId::new(),
            CustomerId::new(1),
            Money::from_cents(200),
            OrderStatus::New,
        )
    }

    #[tokio::test]
    async fn publish_is_recorded_per_topic() {
        let bus = RecordingOrderBus::new();
        bus.publish("payment-orders", &order()).await.unwrap();
        bus.publish("other", &order()).await.unwrap();
        assert_eq!(bus.published().await.len(), 2);
        assert_eq!(bus.published_to("payment-orders").await.len(), 1);
    }

    #[tokio::test]
    async fn delivered_orders_reach_subscribers() {
        let bus = RecordingOrderBus::new();
        let mut stream = bus.subscribe(&["orders"]).await.unwrap();
        let sent = order();
        bus.deliver(sent.clone()).await;
        bus.close().await;
        let received = stream.next().await.unwrap().unwrap();
        assert_eq!(received, sent);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn injected_publish_failure_surfaces() {
        let bus = RecordingOrderBus::new();
        bus.fail_publish(true);
        let err = bus.publish("payment-orders", &order()).await.unwrap_err();
        assert!(matches!(err, BusError::PublishFailed { .. }));
        assert!(bus.published().await.is_empty());
    }
}
