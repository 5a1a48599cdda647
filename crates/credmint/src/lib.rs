//! # Credmint
//!
//! Dynamic credential issuance: every request mints a fresh principal and
//! secret, creates them in a backing data store under a role's statements,
//! and hands them back with a lease.
//!
//! ## Overview
//!
//! - **Roles**: Named statement templates with `{{name}}`, `{{password}}` and
//!   `{{expiration}}` placeholders
//! - **Identity**: Principals are `displayname-uuid`, bounded to the store's
//!   identifier limit
//! - **Leases**: The configured lease or a one-hour default; the store-side
//!   expiration carries a 10% grace period
//! - **Atomicity**: All statements of one issuance commit together or not at all
//!
//! ## Usage
//!
//! ```rust,no_run
//! use credmint::{Engine, EngineConfig};
//! use credmint::core::{Role, RoleName};
//! use credmint::store::{ConfigStore, SqliteBackend, SqliteBackendConfig, SqliteConfigStore};
//!
//! async fn example() {
//!     let config_store = SqliteConfigStore::open("config.db").unwrap();
//!     let role = Role::new(
//!         RoleName::new("writer").unwrap(),
//!         "INSERT INTO principals (name, password, valid_until) \
//!          VALUES ('{{name}}', '{{password}}', '{{expiration}}');",
//!     );
//!     config_store.put_role(&role).await.unwrap();
//!
//!     let backend = SqliteBackend::open(SqliteBackendConfig::new("app.db")).unwrap();
//!     let engine = Engine::new(config_store, backend, EngineConfig::default()).unwrap();
//!
//!     let envelope = engine.issue_raw("writer", "ci-deploy").await.unwrap();
//!     println!("{} valid for {:?}", envelope.data.username, envelope.lease_duration);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `credmint::core` - Requests, roles, templating, identity and leases
//! - `credmint::store` - Configuration store and backing-store abstractions

pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod executor;

// Re-export component crates
pub use credmint_core as core;
pub use credmint_store as store;

// Re-export main types for convenience
pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;
pub use envelope::{InternalData, PublicData, SecretEnvelope};
pub use error::{EngineError, ExecError, PublicError, PublicErrorCode, Result};
pub use executor::TransactionalExecutor;

// Re-export commonly used core types
pub use credmint_core::{
    Clock, DisplayName, FixedClock, IssueRequest, LeaseConfig, Principal, RandomSource, Role,
    RoleName, Secret, SystemClock,
};
