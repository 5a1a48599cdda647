//! In-memory implementations of the store traits.
//!
//! These are primarily for testing. [`MemoryBackend`] understands the
//! principal dialect in [`crate::dialect`] and gives each transaction its own
//! staged view, applied atomically at commit. Both types support fault
//! injection so failure paths can be exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use credmint_core::{LeaseConfig, Role, RoleName};

use crate::dialect::{self, Op, PrincipalRecord, Registry};
use crate::error::{Result, StoreError};
use crate::traits::{Backend, ConfigStore, Prepared, Transaction, TxState};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration store
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory role and lease configuration.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryConfigStore {
    roles: RwLock<HashMap<RoleName, Role>>,
    lease: RwLock<Option<LeaseConfig>>,
    fail_reads: AtomicBool,
}

impl MemoryConfigStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail with `StoreError::Unavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_readable(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("configuration store offline".into()));
        }
        Ok(())
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Poisoned(e.to_string())
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get_role(&self, name: &RoleName) -> Result<Option<Role>> {
        self.check_readable()?;
        let roles = self.roles.read().map_err(poisoned)?;
        Ok(roles.get(name).cloned())
    }

    async fn put_role(&self, role: &Role) -> Result<()> {
        let mut roles = self.roles.write().map_err(poisoned)?;
        roles.insert(role.name.clone(), role.clone());
        Ok(())
    }

    async fn get_lease(&self) -> Result<Option<LeaseConfig>> {
        self.check_readable()?;
        Ok(*self.lease.read().map_err(poisoned)?)
    }

    async fn put_lease(&self, lease: &LeaseConfig) -> Result<()> {
        *self.lease.write().map_err(poisoned)? = Some(*lease);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backing store
// ─────────────────────────────────────────────────────────────────────────────

/// Counters describing how a [`MemoryBackend`] has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackendStats {
    pub begun: usize,
    pub committed: usize,
    pub rolled_back: usize,
    pub executed: usize,
}

#[derive(Default)]
struct Shared {
    registry: Mutex<Registry>,
    fail_begin: AtomicBool,
    fail_commit: AtomicBool,
    fail_rollback: AtomicBool,
    fail_statement: Mutex<Option<String>>,
    begun: AtomicUsize,
    committed: AtomicUsize,
    rolled_back: AtomicUsize,
    executed: AtomicUsize,
}

/// In-memory backing store holding principals and their grants.
///
/// Cloning yields another handle to the same store.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

impl MemoryBackend {
    /// Create an empty backing store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `begin` fail.
    pub fn set_fail_begin(&self, fail: bool) {
        self.shared.fail_begin.store(fail, Ordering::SeqCst);
    }

    /// Make `commit` fail.
    pub fn set_fail_commit(&self, fail: bool) {
        self.shared.fail_commit.store(fail, Ordering::SeqCst);
    }

    /// Make `rollback` of an active transaction fail. Staged changes are
    /// still never applied.
    pub fn set_fail_rollback(&self, fail: bool) {
        self.shared.fail_rollback.store(fail, Ordering::SeqCst);
    }

    /// Make `exec` fail for any statement containing `needle`.
    pub fn set_fail_statement(&self, needle: Option<&str>) {
        if let Ok(mut slot) = self.shared.fail_statement.lock() {
            *slot = needle.map(String::from);
        }
    }

    /// Whether a committed principal with this name exists.
    pub fn has_principal(&self, name: &str) -> bool {
        self.principal(name).is_some()
    }

    /// A committed principal, if present.
    pub fn principal(&self, name: &str) -> Option<PrincipalRecord> {
        self.shared
            .registry
            .lock()
            .ok()
            .and_then(|reg| reg.get(name).cloned())
    }

    /// Number of committed principals.
    pub fn principal_count(&self) -> usize {
        self.shared.registry.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Names of all committed principals.
    pub fn principal_names(&self) -> Vec<String> {
        self.shared
            .registry
            .lock()
            .map(|r| r.names().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Usage counters.
    pub fn stats(&self) -> BackendStats {
        BackendStats {
            begun: self.shared.begun.load(Ordering::SeqCst),
            committed: self.shared.committed.load(Ordering::SeqCst),
            rolled_back: self.shared.rolled_back.load(Ordering::SeqCst),
            executed: self.shared.executed.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        if self.shared.fail_begin.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        let view = self.shared.registry.lock().map_err(poisoned)?.clone();
        self.shared.begun.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            view,
            ops: Vec::new(),
            state: TxState::Active,
        }))
    }
}

/// A staged transaction against a [`MemoryBackend`].
///
/// Statements are applied to a private copy of the registry as they run, and
/// replayed against the shared registry at commit. If the replay fails
/// because a concurrent transaction committed a conflicting change, the
/// commit fails and nothing is applied.
struct MemoryTransaction {
    shared: Arc<Shared>,
    view: Registry,
    ops: Vec<Op>,
    state: TxState,
}

impl MemoryTransaction {
    fn ensure_active(&self) -> Result<()> {
        if self.state == TxState::Active {
            Ok(())
        } else {
            Err(StoreError::TransactionClosed)
        }
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn prepare(&mut self, sql: &str) -> Result<Prepared> {
        self.ensure_active()?;
        dialect::parse(sql)?;
        Ok(Prepared::new(sql))
    }

    async fn exec(&mut self, statement: &Prepared) -> Result<u64> {
        self.ensure_active()?;
        let injected = self
            .shared
            .fail_statement
            .lock()
            .map_err(poisoned)?
            .as_deref()
            .is_some_and(|needle| statement.sql().contains(needle));
        if injected {
            return Err(StoreError::Rejected("injected statement failure".into()));
        }

        let op = dialect::parse(statement.sql())?;
        self.view.apply(&op)?;
        self.ops.push(op);
        self.shared.executed.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;
        if self.shared.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("commit failed".into()));
        }

        let mut registry = self.shared.registry.lock().map_err(poisoned)?;
        let mut next = registry.clone();
        for op in &self.ops {
            next.apply(op)
                .map_err(|e| StoreError::Rejected(format!("serialization failure: {}", e)))?;
        }
        *registry = next;
        drop(registry);

        self.state = TxState::Committed;
        self.shared.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.state != TxState::Active {
            return Ok(());
        }
        if self.shared.fail_rollback.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("rollback failed".into()));
        }
        self.ops.clear();
        self.state = TxState::RolledBack;
        self.shared.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn state(&self) -> TxState {
        self.state
    }
}
