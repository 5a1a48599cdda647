//! Store traits: the abstract interfaces the engine talks to.
//!
//! [`ConfigStore`] holds role definitions and lease configuration.
//! [`Backend`] is the data store credentials are created in; all work against
//! it happens inside a [`Transaction`].

use async_trait::async_trait;
use credmint_core::{LeaseConfig, Role, RoleName};

use crate::error::Result;

/// Read access to role definitions and lease configuration.
///
/// The write methods exist to seed configuration; the engine only reads.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Role Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a role by name.
    ///
    /// Returns `Ok(None)` when no such role exists; errors are reserved for
    /// failures of the store itself.
    async fn get_role(&self, name: &RoleName) -> Result<Option<Role>>;

    /// Insert or replace a role.
    async fn put_role(&self, role: &Role) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Lease Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the configured lease, if any.
    async fn get_lease(&self) -> Result<Option<LeaseConfig>>;

    /// Set the lease configuration.
    async fn put_lease(&self, lease: &LeaseConfig) -> Result<()>;
}

/// A statement accepted by [`Transaction::prepare`].
///
/// Only the transaction that prepared it should execute it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    sql: String,
}

impl Prepared {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// Lifecycle of a transaction handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Active,
    Committed,
    RolledBack,
}

/// One atomic unit of work against the backing store.
///
/// A failed `commit` leaves the transaction `Active` so the caller can still
/// roll it back. Every method other than `rollback` fails with
/// `StoreError::TransactionClosed` once the transaction is finished;
/// `rollback` on a finished transaction is a no-op.
#[async_trait]
pub trait Transaction: Send {
    /// Parse and check a statement without running it.
    async fn prepare(&mut self, sql: &str) -> Result<Prepared>;

    /// Execute a prepared statement. Returns the number of affected rows.
    async fn exec(&mut self, statement: &Prepared) -> Result<u64>;

    /// Make every executed statement durable.
    async fn commit(&mut self) -> Result<()>;

    /// Discard every executed statement.
    async fn rollback(&mut self) -> Result<()>;

    /// Current state of the handle.
    fn state(&self) -> TxState;
}

/// The backing data store credentials are created in.
///
/// Implementations own their connection pooling; each `begin` acquires a
/// connection that is released when the transaction is dropped.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Open a new transaction.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;
}
