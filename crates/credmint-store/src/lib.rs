//! # Credmint Store
//!
//! Storage abstractions for Credmint. Provides trait-based interfaces for
//! role/lease configuration and for the backing store credentials are created
//! in, with SQLite and in-memory implementations of both.
//!
//! ## Key Types
//!
//! - [`ConfigStore`] - Role definitions and lease configuration
//! - [`Backend`] / [`Transaction`] - Atomic statement execution
//! - [`SqliteConfigStore`], [`SqliteBackend`] - SQLite-based storage
//! - [`MemoryConfigStore`], [`MemoryBackend`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use credmint_store::{Backend, SqliteBackend, SqliteBackendConfig};
//!
//! async fn example() {
//!     let backend = SqliteBackend::open(SqliteBackendConfig::new("app.db")).unwrap();
//!
//!     let mut tx = backend.begin().await.unwrap();
//!     let stmt = tx.prepare("INSERT INTO principals (name) VALUES ('x')").await.unwrap();
//!     tx.exec(&stmt).await.unwrap();
//!     tx.commit().await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Missing is not an error**: absent roles and lease configuration are `Ok(None)`
//! - **Same handle**: statements are prepared and executed through the transaction
//!   that is later committed or rolled back
//! - **Failed commit stays active**: the caller can still roll back

pub mod dialect;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{BackendStats, MemoryBackend, MemoryConfigStore};
pub use sqlite::{SqliteBackend, SqliteBackendConfig, SqliteConfigStore};
pub use traits::{Backend, ConfigStore, Prepared, Transaction, TxState};
