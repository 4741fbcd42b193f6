//! # Payment Ledger Testing
//!
//! In-memory doubles for the two boundaries of the payment ledger:
//!
//! - [`InMemoryCustomerStore`] - a mutexed map standing in for the Postgres
//!   ledger, with failure injection for infrastructure-error paths
//! - [`RecordingOrderBus`] - captures published order events and lets tests
//!   push inbound events into subscriber streams
//!
//! Both honor the same contracts as the production implementations: the
//! store applies transitions atomically under its lock, and the bus
//! delivers whatever a test injects, errors included.
//!
//! ## Example
//!
//! ```ignore
//! let store = Arc::new(InMemoryCustomerStore::new());
//! store.seed(Customer::new(id, "Alice".into(), Money::from_cents(1000), Money::ZERO)).await;
//!
//! let bus = Arc::new(RecordingOrderBus::new());
//! let dispatcher = OrderDispatcher::new(ReservationEngine::new(store), bus.clone(), "payment-orders");
//! dispatcher.dispatch(order).await?;
//! assert_eq!(bus.published().await.len(), 1);
//! ```

pub mod bus;
pub mod store;

pub use bus::RecordingOrderBus;
pub use store::InMemoryCustomerStore;
