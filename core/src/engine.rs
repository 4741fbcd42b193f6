//! The reservation engine: the only writer of balance fields.
//!
//! Each operation is one atomic unit against the ledger: the store loads
//! the row under its row transaction, the pure transition function
//! validates and mutates, and the store persists and commits. The engine
//! itself holds no state and does no I/O beyond the single store call, so
//! a future explicit per-order reservation ledger can replace the store
//! implementation without touching the dispatcher.

use crate::balance::BalanceTransition;
use crate::customer::{Customer, CustomerId, Money};
use crate::error::LedgerError;
use crate::order::OrderId;
use crate::store::CustomerStore;
use std::sync::Arc;

/// Applies validated balance transitions to the ledger.
#[derive(Debug)]
pub struct ReservationEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for ReservationEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: CustomerStore> ReservationEngine<S> {
    /// Creates an engine over the given store
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Reserve funds for a new order: `available -= total; reserved += total`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::CustomerNotFound`] when the customer is absent
    /// - [`LedgerError::InsufficientAvailableBalance`] when available funds
    ///   cannot cover the total; the row is unchanged
    /// - [`LedgerError::Storage`] when the store cannot process the request
    pub async fn reserve(
        &self,
        customer_id: CustomerId,
        order_id: OrderId,
        total: Money,
    ) -> Result<Customer, LedgerError> {
        let transition = BalanceTransition::Reserve {
            order_id,
            amount: total,
        };
        let customer = self.store.apply(customer_id, transition).await?;
        tracing::info!(
            customer_id = %customer_id,
            order_id = %order_id,
            total = %total,
            available = %customer.available,
            reserved = %customer.reserved,
            "Customer reservation created"
        );
        Ok(customer)
    }

    /// Undo a reservation: `reserved -= total; available += total`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::CustomerNotFound`] when the customer is absent
    /// - [`LedgerError::InsufficientReservedBalance`] when reserved funds
    ///   cannot cover the total; the row is unchanged
    /// - [`LedgerError::Storage`] when the store cannot process the request
    pub async fn rollback(
        &self,
        customer_id: CustomerId,
        order_id: OrderId,
        total: Money,
    ) -> Result<Customer, LedgerError> {
        let transition = BalanceTransition::Rollback {
            order_id,
            amount: total,
        };
        let customer = self.store.apply(customer_id, transition).await?;
        tracing::info!(
            customer_id = %customer_id,
            order_id = %order_id,
            total = %total,
            available = %customer.available,
            reserved = %customer.reserved,
            "Customer reservation rolled back"
        );
        Ok(customer)
    }

    /// Finalize a reservation: `reserved -= total`; funds leave the ledger.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::CustomerNotFound`] when the customer is absent
    /// - [`LedgerError::InsufficientReservedBalance`] when reserved funds
    ///   cannot cover the total; the row is unchanged
    /// - [`LedgerError::Storage`] when the store cannot process the request
    pub async fn confirm(
        &self,
        customer_id: CustomerId,
        order_id: OrderId,
        total: Money,
    ) -> Result<Customer, LedgerError> {
        let transition = BalanceTransition::Confirm {
            order_id,
            amount: total,
        };
        let customer = self.store.apply(customer_id, transition).await?;
        tracing::info!(
            customer_id = %customer_id,
            order_id = %order_id,
            total = %total,
            available = %customer.available,
            reserved = %customer.reserved,
            "Customer reservation confirmed"
        );
        Ok(customer)
    }
}
