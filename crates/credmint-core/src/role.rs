//! Role definitions and stored lease configuration.

use serde::{Deserialize, Serialize};

use crate::types::RoleName;

/// A named template describing what an issued credential is granted.
///
/// `creation_statements` is raw template text that may hold several
/// statements separated by `;`. Roles are read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: RoleName,
    pub creation_statements: String,
    /// Statements that drop a principal issued under this role.
    ///
    /// When absent the engine falls back to its configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_statements: Option<String>,
}

impl Role {
    pub fn new(name: RoleName, creation_statements: impl Into<String>) -> Self {
        Self {
            name,
            creation_statements: creation_statements.into(),
            revocation_statements: None,
        }
    }

    /// Set the revocation statements for this role.
    pub fn with_revocation(mut self, statements: impl Into<String>) -> Self {
        self.revocation_statements = Some(statements.into());
        self
    }
}

/// Lease configuration as persisted by the configuration store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseConfig {
    pub duration_secs: u64,
}

impl LeaseConfig {
    pub fn new(duration_secs: u64) -> Self {
        Self { duration_secs }
    }
}
