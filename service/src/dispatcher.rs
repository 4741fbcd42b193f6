//! The order event dispatcher: a state machine keyed by order status.
//!
//! | status       | action   | on success        | on business failure      | on infrastructure failure |
//! |--------------|----------|-------------------|--------------------------|---------------------------|
//! | New          | reserve  | publish `Accept`  | publish `Reject`+reason  | propagate                 |
//! | Rollback     | rollback | nothing outbound  | log and swallow          | propagate                 |
//! | Confirmation | confirm  | nothing outbound  | log and swallow          | propagate                 |
//! | other        | none     | -                 | log warning, drop        | -                         |
//!
//! The new-order path is request-like: the upstream saga expects an
//! accept/reject answer, so business failures fold into a `Reject` event
//! instead of propagating. Rollback and confirmation are fire-and-forget
//! compensations; swallowing their business failures avoids poison-message
//! loops. A missing customer and any storage failure propagate on every
//! path, so redelivery (not silence) owns recovery.

use futures::StreamExt;
use payment_ledger_core::bus::{BusError, OrderBus, OrderStream};
use payment_ledger_core::engine::ReservationEngine;
use payment_ledger_core::store::CustomerStore;
use payment_ledger_core::{FailureKind, LedgerError, Order, OrderStatus};
use std::sync::Arc;
use thiserror::Error;

/// Failures the dispatcher does not handle itself.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A ledger failure the current status's policy does not swallow
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The outbound answer could not be published
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Routes inbound order events to the reservation engine and publishes
/// accept/reject answers for new orders.
pub struct OrderDispatcher<S, B> {
    engine: ReservationEngine<S>,
    bus: Arc<B>,
    outbound_topic: String,
}

impl<S: CustomerStore, B: OrderBus> OrderDispatcher<S, B> {
    /// Creates a dispatcher publishing answers to `outbound_topic`
    pub fn new(engine: ReservationEngine<S>, bus: Arc<B>, outbound_topic: impl Into<String>) -> Self {
        Self {
            engine,
            bus,
            outbound_topic: outbound_topic.into(),
        }
    }

    /// Processes one inbound order event to completion.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] only for failures the per-status policy
    /// propagates: storage failures on any path, a missing customer on the
    /// new-order path, and outbound publish failures.
    pub async fn dispatch(&self, order: Order) -> Result<(), DispatchError> {
        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            status = %order.status,
            total = %order.total_price,
            "Received order event"
        );
        match order.status {
            OrderStatus::New => self.process_new(order).await,
            OrderStatus::Rollback => self.process_rollback(order).await,
            OrderStatus::Confirmation => self.process_confirmation(order).await,
            OrderStatus::Accept | OrderStatus::Reject => {
                tracing::warn!(
                    order_id = %order.id,
                    status = %order.status,
                    "Unexpected order status, dropping event"
                );
                Ok(())
            }
        }
    }

    /// Consumes the stream until it ends, processing each event to
    /// completion (ledger write and, for new orders, the outbound publish)
    /// before taking the next one.
    ///
    /// Transport and decode errors on the stream are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the first propagated [`DispatchError`]; the caller decides
    /// whether that terminates the service.
    pub async fn run(&self, mut stream: OrderStream) -> Result<(), DispatchError> {
        while let Some(result) = stream.next().await {
            match result {
                Ok(order) => self.dispatch(order).await?,
                Err(e) => {
                    tracing::error!(error = %e, "Order stream error, skipping event");
                }
            }
        }
        tracing::info!("Order stream ended");
        Ok(())
    }

    async fn process_new(&self, order: Order) -> Result<(), DispatchError> {
        let answer = match self
            .engine
            .reserve(order.customer_id, order.id, order.total_price)
            .await
        {
            Ok(_) => order.accepted(),
            Err(e) if e.is_business() => {
                tracing::info!(
                    order_id = %order.id,
                    customer_id = %order.customer_id,
                    error = %e,
                    "Reservation rejected"
                );
                order.rejected(e.to_string())
            }
            // CustomerNotFound and Storage both surface to the caller; a
            // missing customer is a wiring defect, not a funds problem.
            Err(e) => return Err(e.into()),
        };

        self.bus.publish(&self.outbound_topic, &answer).await?;
        tracing::info!(
            order_id = %answer.id,
            status = %answer.status,
            topic = %self.outbound_topic,
            "Published order answer"
        );
        Ok(())
    }

    async fn process_rollback(&self, order: Order) -> Result<(), DispatchError> {
        let result = self
            .engine
            .rollback(order.customer_id, order.id, order.total_price)
            .await;
        Self::swallow_compensation_failure("rollback", &order, result)
    }

    async fn process_confirmation(&self, order: Order) -> Result<(), DispatchError> {
        let result = self
            .engine
            .confirm(order.customer_id, order.id, order.total_price)
            .await;
        Self::swallow_compensation_failure("confirmation", &order, result)
    }

    /// The explicit log-and-drop policy for fire-and-forget compensations.
    ///
    /// Business failures and a missing customer are swallowed (logged
    /// only); storage failures still propagate, since dropping them under
    /// at-least-once delivery risks permanent ledger drift.
    fn swallow_compensation_failure<T>(
        operation: &str,
        order: &Order,
        result: Result<T, LedgerError>,
    ) -> Result<(), DispatchError> {
        match result {
            Ok(_) => Ok(()),
            Err(e) => match e.kind() {
                FailureKind::Business | FailureKind::NotFound => {
                    tracing::error!(
                        order_id = %order.id,
                        customer_id = %order.customer_id,
                        error = %e,
                        "Error during {operation} reservation, dropping event"
                    );
                    Ok(())
                }
                FailureKind::Infrastructure => Err(e.into()),
            },
        }
    }
}
