//! Persistence boundary for the customer ledger.
//!
//! The store owns transaction semantics; the business rules stay in
//! [`crate::balance`]. Implementations must guarantee that
//! [`CustomerStore::apply`] runs the whole load-check-mutate-persist
//! sequence as one atomic unit scoped to the single customer row, so that
//! two concurrent transitions for the same customer serialize.
//!
//! Administrative CRUD lives here too; it validates rows but never routes a
//! balance *transition* around [`CustomerStore::apply`].

use crate::balance::BalanceTransition;
use crate::customer::{Customer, CustomerId};
use crate::error::LedgerError;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No customer with the given id exists.
    #[error("There is no customer with id = {0}")]
    NotFound(CustomerId),

    /// A customer with the given id already exists.
    #[error("Customer with id = {0} already exists")]
    AlreadyExists(CustomerId),

    /// The row failed field-level validation.
    #[error("Customer validation failed: {0}")]
    Invalid(String),

    /// The storage backend could not process the request.
    #[error("Store operation failed: {0}")]
    Connection(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(customer_id) => Self::CustomerNotFound { customer_id },
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Boxed future returned by [`CustomerStore::apply`].
pub type ApplyFuture<'a> = Pin<Box<dyn Future<Output = Result<Customer, LedgerError>> + Send + 'a>>;

/// Durable store of one ledger row per customer.
///
/// # Atomicity contract
///
/// [`CustomerStore::apply`] is the only entry point that mutates balance
/// fields, and implementations must execute it inside a per-row transaction
/// (row lock or equivalent) held for the *entire* check-then-mutate
/// sequence. Reading balances outside that transaction and mutating them
/// later is a double-spend bug, not an optimization.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync`; the dispatcher shares one store
/// across workers.
pub trait CustomerStore: Send + Sync {
    /// Load a customer row.
    ///
    /// Reads taken through `get` are snapshots for administrative reads;
    /// they must never feed a mutation.
    fn get(&self, id: CustomerId) -> StoreFuture<'_, Customer>;

    /// Create a customer row with its initial balances.
    ///
    /// Fails with [`StoreError::AlreadyExists`] when the id is taken and
    /// [`StoreError::Invalid`] when the row fails field validation.
    fn create(&self, customer: Customer) -> StoreFuture<'_, CustomerId>;

    /// Replace the administrative fields and balances of an existing row.
    ///
    /// This is the top-up/correction path; it validates the row but is not
    /// part of the reservation protocol.
    fn update(&self, customer: Customer) -> StoreFuture<'_, Customer>;

    /// Delete a customer row.
    fn delete(&self, id: CustomerId) -> StoreFuture<'_, ()>;

    /// List customer rows ordered by id.
    fn list(&self, offset: i64, limit: i64) -> StoreFuture<'_, Vec<Customer>>;

    /// Atomically apply a balance transition to one row.
    ///
    /// Loads the row under the row transaction, runs
    /// [`crate::balance::apply`], persists the result and commits. Returns
    /// the committed row. On any error the row is unchanged.
    fn apply(&self, id: CustomerId, transition: BalanceTransition) -> ApplyFuture<'_>;
}
