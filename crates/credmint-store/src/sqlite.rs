//! SQLite implementations of the store traits.
//!
//! [`SqliteConfigStore`] persists roles and lease configuration.
//! [`SqliteBackend`] runs role statements against a SQLite database file,
//! one connection per transaction, bounded by a semaphore acting as the
//! connection pool. Blocking calls are wrapped in `tokio::spawn_blocking`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use credmint_core::{LeaseConfig, Role, RoleName};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{Backend, ConfigStore, Prepared, Transaction, TxState};

/// Run `f` against a shared connection on the blocking thread pool.
async fn blocking<T, F>(conn: Arc<Mutex<Connection>>, f: F) -> Result<T>
where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = conn
            .lock()
            .map_err(|e| StoreError::Poisoned(format!("sqlite connection: {}", e)))?;
        f(&mut conn)
    })
    .await
    .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))?
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration store
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite-backed role and lease configuration.
///
/// Thread-safe via internal Mutex.
pub struct SqliteConfigStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteConfigStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn get_role(&self, name: &RoleName) -> Result<Option<Role>> {
        let name = name.clone();

        blocking(self.conn.clone(), move |conn| {
            let entry: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT entry FROM roles WHERE name = ?1",
                    params![name.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(entry) = entry else {
                return Ok(None);
            };
            let role: Role = decode(&entry)?;
            if role.name != name {
                return Err(StoreError::InvalidData(format!(
                    "entry for role {} holds role {}",
                    name, role.name
                )));
            }
            Ok(Some(role))
        })
        .await
    }

    async fn put_role(&self, role: &Role) -> Result<()> {
        let name = role.name.as_str().to_string();
        let entry = encode(role)?;

        blocking(self.conn.clone(), move |conn| {
            conn.execute(
                "INSERT INTO roles (name, entry, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(name) DO UPDATE SET
                    entry = excluded.entry,
                    updated_at = excluded.updated_at",
                params![name, entry, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_lease(&self) -> Result<Option<LeaseConfig>> {
        blocking(self.conn.clone(), |conn| {
            let entry: Option<Vec<u8>> = conn
                .query_row("SELECT entry FROM lease_config WHERE id = 1", [], |row| {
                    row.get(0)
                })
                .optional()?;
            entry.map(|e| decode(&e)).transpose()
        })
        .await
    }

    async fn put_lease(&self, lease: &LeaseConfig) -> Result<()> {
        let entry = encode(lease)?;

        blocking(self.conn.clone(), move |conn| {
            conn.execute(
                "INSERT INTO lease_config (id, entry, updated_at) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET
                    entry = excluded.entry,
                    updated_at = excluded.updated_at",
                params![entry, now_millis()],
            )?;
            Ok(())
        })
        .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backing store
// ─────────────────────────────────────────────────────────────────────────────

/// Connection settings for [`SqliteBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteBackendConfig {
    /// Database file credentials are created in.
    pub path: PathBuf,
    /// Maximum number of concurrently open transactions.
    pub pool_size: usize,
    /// How long a connection waits on a locked database.
    pub busy_timeout: Duration,
}

impl SqliteBackendConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool_size: 8,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// A SQLite database used as the backing store.
pub struct SqliteBackend {
    config: SqliteBackendConfig,
    permits: Arc<Semaphore>,
}

impl SqliteBackend {
    /// Check that the database can be opened and set up the pool.
    pub fn open(config: SqliteBackendConfig) -> Result<Self> {
        if config.pool_size == 0 {
            return Err(StoreError::InvalidData("pool_size must be at least 1".into()));
        }
        connect(&config)?;
        Ok(Self {
            permits: Arc::new(Semaphore::new(config.pool_size)),
            config,
        })
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Connections currently free in the pool.
    pub fn available_connections(&self) -> usize {
        self.permits.available_permits()
    }
}

fn connect(config: &SqliteBackendConfig) -> Result<Connection> {
    let conn = Connection::open(&config.path)?;
    conn.busy_timeout(config.busy_timeout)?;
    Ok(conn)
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| StoreError::Unavailable("connection pool closed".into()))?;

        let config = self.config.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = connect(&config)?;
            conn.execute_batch("BEGIN IMMEDIATE")?;
            Ok(conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {}", e)))??;

        Ok(Box::new(SqliteTransaction {
            conn: Arc::new(Mutex::new(conn)),
            state: TxState::Active,
            _permit: permit,
        }))
    }
}

/// A transaction on a dedicated connection.
///
/// Dropping an unfinished transaction closes its connection, which makes
/// SQLite roll the transaction back.
struct SqliteTransaction {
    conn: Arc<Mutex<Connection>>,
    state: TxState,
    _permit: OwnedSemaphorePermit,
}

impl SqliteTransaction {
    fn ensure_active(&self) -> Result<()> {
        if self.state == TxState::Active {
            Ok(())
        } else {
            Err(StoreError::TransactionClosed)
        }
    }
}

#[async_trait]
impl Transaction for SqliteTransaction {
    async fn prepare(&mut self, sql: &str) -> Result<Prepared> {
        self.ensure_active()?;
        let owned = sql.to_string();

        blocking(self.conn.clone(), move |conn| {
            conn.prepare_cached(&owned)?;
            Ok(())
        })
        .await?;

        Ok(Prepared::new(sql))
    }

    async fn exec(&mut self, statement: &Prepared) -> Result<u64> {
        self.ensure_active()?;
        let sql = statement.sql().to_string();

        blocking(self.conn.clone(), move |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let changed = stmt.execute([])?;
            Ok(changed as u64)
        })
        .await
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;

        blocking(self.conn.clone(), |conn| {
            conn.execute_batch("COMMIT")?;
            Ok(())
        })
        .await?;

        self.state = TxState::Committed;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.state != TxState::Active {
            return Ok(());
        }

        blocking(self.conn.clone(), |conn| {
            // A failed statement may already have ended the transaction.
            if !conn.is_autocommit() {
                conn.execute_batch("ROLLBACK")?;
            }
            Ok(())
        })
        .await?;

        self.state = TxState::RolledBack;
        Ok(())
    }

    fn state(&self) -> TxState {
        self.state
    }
}
