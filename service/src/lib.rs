//! # Payment Ledger Service
//!
//! The imperative shell around the ledger core: consumes order events from
//! the broker, routes them through the [`dispatcher::OrderDispatcher`]
//! state machine, and answers new orders with accept/reject events.
//!
//! The binary in `main.rs` wires the Postgres store and the Redpanda bus
//! to the dispatcher; the scenario tests in `tests/` run the same
//! dispatcher against in-memory doubles.

pub mod config;
pub mod dispatcher;

pub use config::ServiceConfig;
pub use dispatcher::{DispatchError, OrderDispatcher};
