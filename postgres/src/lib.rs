//! `PostgreSQL` customer store for the payment ledger.
//!
//! Implements [`CustomerStore`] over a `sqlx` connection pool. The one
//! operation that matters here is [`CustomerStore::apply`]: it opens a
//! transaction, takes a row lock with `SELECT ... FOR UPDATE`, runs the
//! pure transition function against the locked row, persists and commits.
//! Two concurrent transitions for the same customer therefore serialize on
//! the database row; there is no window in which both can validate against
//! the same stale balance.
//!
//! Administrative CRUD (create, update, delete, paged list) lives here too
//! and validates rows, but never touches balances outside that transaction
//! discipline.
//!
//! # Example
//!
//! ```no_run
//! use payment_ledger_postgres::PostgresCustomerStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresCustomerStore::connect("postgres://localhost/payment").await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use payment_ledger_core::balance::{self, BalanceTransition};
use payment_ledger_core::store::{ApplyFuture, CustomerStore, StoreError, StoreFuture};
use payment_ledger_core::{Customer, CustomerId, LedgerError, Money};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// `PostgreSQL`-backed [`CustomerStore`].
///
/// Cheap to clone; the pool is internally reference-counted.
#[derive(Clone, Debug)]
pub struct PostgresCustomerStore {
    pool: PgPool,
}

impl PostgresCustomerStore {
    /// Connect to the database and build a store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] when the pool cannot be
    /// established.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to connect: {e}")))?;
        Ok(Self { pool })
    }

    /// Build a store from an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the customer table if it does not exist.
    ///
    /// The check constraints are a database-level backstop for the ledger
    /// invariant; the engine validates before ever reaching them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] when the DDL cannot be executed.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS customer (
                id BIGINT PRIMARY KEY,
                name TEXT NOT NULL,
                balance_available BIGINT NOT NULL CHECK (balance_available >= 0),
                balance_reserved BIGINT NOT NULL CHECK (balance_reserved >= 0),
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(connection_error)?;
        tracing::info!("Customer table ready");
        Ok(())
    }

    /// The underlying pool, for test harnesses.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn connection_error(e: sqlx::Error) -> StoreError {
    StoreError::Connection(e.to_string())
}

fn row_to_customer(row: &PgRow) -> Result<Customer, sqlx::Error> {
    Ok(Customer {
        id: CustomerId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        available: Money::from_cents(row.try_get("balance_available")?),
        reserved: Money::from_cents(row.try_get("balance_reserved")?),
    })
}

fn validated(customer: Customer) -> Result<Customer, StoreError> {
    customer
        .validate()
        .map_err(|violations| StoreError::Invalid(violations.join("; ")))?;
    Ok(customer)
}

impl CustomerStore for PostgresCustomerStore {
    fn get(&self, id: CustomerId) -> StoreFuture<'_, Customer> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT id, name, balance_available, balance_reserved FROM customer WHERE id = $1",
            )
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(connection_error)?;

            match row {
                Some(row) => row_to_customer(&row).map_err(connection_error),
                None => Err(StoreError::NotFound(id)),
            }
        })
    }

    fn create(&self, customer: Customer) -> StoreFuture<'_, CustomerId> {
        Box::pin(async move {
            let customer = validated(customer)?;
            let result = sqlx::query(
                r"
                INSERT INTO customer (id, name, balance_available, balance_reserved)
                VALUES ($1, $2, $3, $4)
                ",
            )
            .bind(customer.id.value())
            .bind(&customer.name)
            .bind(customer.available.cents())
            .bind(customer.reserved.cents())
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => {
                    tracing::info!(customer_id = %customer.id, "Created customer");
                    Ok(customer.id)
                }
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    Err(StoreError::AlreadyExists(customer.id))
                }
                Err(e) => Err(connection_error(e)),
            }
        })
    }

    fn update(&self, customer: Customer) -> StoreFuture<'_, Customer> {
        Box::pin(async move {
            let customer = validated(customer)?;
            let result = sqlx::query(
                r"
                UPDATE customer
                SET name = $2, balance_available = $3, balance_reserved = $4
                WHERE id = $1
                ",
            )
            .bind(customer.id.value())
            .bind(&customer.name)
            .bind(customer.available.cents())
            .bind(customer.reserved.cents())
            .execute(&self.pool)
            .await
            .map_err(connection_error)?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(customer.id));
            }
            tracing::info!(customer_id = %customer.id, "Updated customer");
            Ok(customer)
        })
    }

    fn delete(&self, id: CustomerId) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM customer WHERE id = $1")
                .bind(id.value())
                .execute(&self.pool)
                .await
                .map_err(connection_error)?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(id));
            }
            tracing::info!(customer_id = %id, "Deleted customer");
            Ok(())
        })
    }

    fn list(&self, offset: i64, limit: i64) -> StoreFuture<'_, Vec<Customer>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, name, balance_available, balance_reserved
                FROM customer ORDER BY id OFFSET $1 LIMIT $2
                ",
            )
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(connection_error)?;

            rows.iter()
                .map(|row| row_to_customer(row).map_err(connection_error))
                .collect()
        })
    }

    fn apply(&self, id: CustomerId, transition: BalanceTransition) -> ApplyFuture<'_> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| LedgerError::Storage(e.to_string()))?;

            // Row lock held for the entire check-then-mutate sequence.
            let row = sqlx::query(
                r"
                SELECT id, name, balance_available, balance_reserved
                FROM customer WHERE id = $1 FOR UPDATE
                ",
            )
            .bind(id.value())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

            let loaded = row
                .map(|row| row_to_customer(&row))
                .transpose()
                .map_err(|e| LedgerError::Storage(e.to_string()))?;
            let mut customer = balance::require_customer(loaded, id)?;

            // A validation failure drops the transaction and releases the
            // lock with the row untouched.
            balance::apply(&mut customer, &transition)?;

            sqlx::query(
                "UPDATE customer SET balance_available = $2, balance_reserved = $3 WHERE id = $1",
            )
            .bind(customer.id.value())
            .bind(customer.available.cents())
            .bind(customer.reserved.cents())
            .execute(&mut *tx)
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

            tx.commit()
                .await
                .map_err(|e| LedgerError::Storage(e.to_string()))?;

            tracing::debug!(
                customer_id = %id,
                transition = %transition,
                available = %customer.available,
                reserved = %customer.reserved,
                "Applied balance transition"
            );
            Ok(customer)
        })
    }
}
