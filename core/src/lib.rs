//! # Payment Ledger Core
//!
//! Domain types and business rules for a saga-participant payment service.
//!
//! The service tracks, per customer, an *available* and a *reserved* balance
//! and mutates them in response to asynchronous order events using a
//! two-phase reservation protocol:
//!
//! - **reserve** moves funds from available to reserved (new order),
//! - **rollback** moves them back (compensation),
//! - **confirm** removes reserved funds from the ledger entirely.
//!
//! ## Crate layout
//!
//! - [`customer`] - the ledger row ([`Customer`]) and value types
//!   ([`CustomerId`], [`Money`])
//! - [`order`] - the inbound/outbound order event and its status machine
//! - [`balance`] - pure validation predicates and the balance transition
//!   function
//! - [`engine`] - [`engine::ReservationEngine`], the only writer of balance
//!   fields
//! - [`store`] - the [`store::CustomerStore`] persistence boundary
//! - [`bus`] - the [`bus::OrderBus`] messaging boundary
//!
//! ## Consistency model
//!
//! No business logic runs outside a store transaction: the store loads the
//! row, runs the pure [`balance::apply`] function, and persists the result
//! as one atomic unit. Two concurrent transitions for the same customer
//! serialize on that transaction; nothing else in the system mutates
//! balances. Delivery is at-least-once and events are *not* deduplicated -
//! replaying a reserve reserves again (see the regression tests in the
//! service crate).

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};

pub mod balance;
pub mod bus;
pub mod customer;
pub mod engine;
pub mod error;
pub mod order;
pub mod store;

pub use balance::BalanceTransition;
pub use customer::{Customer, CustomerId, Money};
pub use error::{FailureKind, LedgerError};
pub use order::{Order, OrderId, OrderStatus};
