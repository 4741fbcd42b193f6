//! In-memory customer store double.

use payment_ledger_core::balance::{self, BalanceTransition};
use payment_ledger_core::store::{ApplyFuture, CustomerStore, StoreError, StoreFuture};
use payment_ledger_core::{Customer, CustomerId, LedgerError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// In-memory [`CustomerStore`] backed by a mutexed map.
///
/// The mutex is held across the whole load-check-mutate sequence of
/// [`CustomerStore::apply`], mirroring the row-lock discipline of the
/// Postgres implementation: concurrent transitions for one customer
/// serialize, and a rejected transition leaves the map untouched.
///
/// `fail_storage(true)` makes every subsequent operation fail with an
/// infrastructure error, for exercising the dispatcher's propagation
/// policy.
#[derive(Debug, Default)]
pub struct InMemoryCustomerStore {
    customers: Mutex<BTreeMap<i64, Customer>>,
    fail_storage: AtomicBool,
}

impl InMemoryCustomerStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a row directly, bypassing validation (test setup only)
    pub async fn seed(&self, customer: Customer) {
        self.customers
            .lock()
            .await
            .insert(customer.id.value(), customer);
    }

    /// Reads a row directly without going through the trait
    pub async fn customer(&self, id: CustomerId) -> Option<Customer> {
        self.customers.lock().await.get(&id.value()).cloned()
    }

    /// Toggles injected infrastructure failures
    pub fn fail_storage(&self, fail: bool) {
        self.fail_storage.store(fail, Ordering::SeqCst);
    }

    fn check_storage(&self) -> Result<(), StoreError> {
        if self.fail_storage.load(Ordering::SeqCst) {
            Err(StoreError::Connection(
                "injected storage failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl CustomerStore for InMemoryCustomerStore {
    fn get(&self, id: CustomerId) -> StoreFuture<'_, Customer> {
        Box::pin(async move {
            self.check_storage()?;
            self.customers
                .lock()
                .await
                .get(&id.value())
                .cloned()
                .ok_or(StoreError::NotFound(id))
        })
    }

    fn create(&self, customer: Customer) -> StoreFuture<'_, CustomerId> {
        Box::pin(async move {
            self.check_storage()?;
            customer
                .validate()
                .map_err(|violations| StoreError::Invalid(violations.join("; ")))?;
            let mut customers = self.customers.lock().await;
            if customers.contains_key(&customer.id.value()) {
                return Err(StoreError::AlreadyExists(customer.id));
            }
            let id = customer.id;
            customers.insert(id.value(), customer);
            Ok(id)
        })
    }

    fn update(&self, customer: Customer) -> StoreFuture<'_, Customer> {
        Box::pin(async move {
            self.check_storage()?;
            customer
                .validate()
                .map_err(|violations| StoreError::Invalid(violations.join("; ")))?;
            let mut customers = self.customers.lock().await;
            if !customers.contains_key(&customer.id.value()) {
                return Err(StoreError::NotFound(customer.id));
            }
            customers.insert(customer.id.value(), customer.clone());
            Ok(customer)
        })
    }

    fn delete(&self, id: CustomerId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check_storage()?;
            self.customers
                .lock()
                .await
                .remove(&id.value())
                .map(|_| ())
                .ok_or(StoreError::NotFound(id))
        })
    }

    fn list(&self, offset: i64, limit: i64) -> StoreFuture<'_, Vec<Customer>> {
        Box::pin(async move {
            self.check_storage()?;
            let customers = self.customers.lock().await;
            Ok(customers
                .values()
                .skip(usize::try_from(offset).unwrap_or(0))
                .take(usize::try_from(limit).unwrap_or(0))
                .cloned()
                .collect())
        })
    }

    fn apply(&self, id: CustomerId, transition: BalanceTransition) -> ApplyFuture<'_> {
        Box::pin(async move {
            self.check_storage().map_err(LedgerError::from)?;
            // Lock held for the whole check-then-mutate sequence.
            let mut customers = self.customers.lock().await;
            let mut customer = balance::require_customer(customers.get(&id.value()).cloned(), id)?;
            balance::apply(&mut customer, &transition)?;
            customers.insert(id.value(), customer.clone());
            Ok(customer)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payment_ledger_core::{Money, OrderId};

    fn alice(available: i64, reserved: i64) -> Customer {
        Customer::new(
            CustomerId::new(1),
            "Alice".to_string(),
            Money::from_cents(available),
            Money::from_cents(reserved),
        )
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryCustomerStore::new();
        store.create(alice(1000, 0)).await.unwrap();
        let loaded = store.get(CustomerId::new(1)).await.unwrap();
        assert_eq!(loaded.available, Money::from_cents(1000));
    }

    #[tokio::test]
    async fn create_twice_reports_already_exists() {
        let store = InMemoryCustomerStore::new();
        store.create(alice(1000, 0)).await.unwrap();
        let err = store.create(alice(500, 0)).await.unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists(CustomerId::new(1)));
    }

    #[tokio::test]
    async fn create_rejects_invalid_rows() {
        let store = InMemoryCustomerStore::new();
        let invalid = Customer::new(
            CustomerId::new(1),
            String::new(),
            Money::from_cents(-1),
            Money::ZERO,
        );
        let err = store.create(invalid).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn apply_rejection_leaves_the_map_untouched() {
        let store = InMemoryCustomerStore::new();
        store.seed(alice(100, 0)).await;
        let err = store
            .apply(
                CustomerId::new(1),
                BalanceTransition::Reserve {
                    order_id: OrderId::new(),
                    amount: Money::from_cents(200),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientAvailableBalance { .. }
        ));
        assert_eq!(
            store.customer(CustomerId::new(1)).await.unwrap(),
            alice(100, 0)
        );
    }

    #[tokio::test]
    async fn injected_failure_surfaces_as_storage_error() {
        let store = InMemoryCustomerStore::new();
        store.seed(alice(1000, 0)).await;
        store.fail_storage(true);
        let err = store
            .apply(
                CustomerId::new(1),
                BalanceTransition::Reserve {
                    order_id: OrderId::new(),
                    amount: Money::from_cents(200),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Storage(_)));
    }

    #[tokio::test]
    async fn list_pages_in_id_order() {
        let store = InMemoryCustomerStore::new();
        for id in [3, 1, 2] {
            store
                .seed(Customer::new(
                    CustomerId::new(id),
                    format!("customer-{id}"),
                    Money::ZERO,
                    Money::ZERO,
                ))
                .await;
        }
        let page = store.list(1, 2).await.unwrap();
        assert_eq!(
            page.iter().map(|c| c.id.value()).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }
}
