//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use credmint_core::identity::{DEFAULT_MAX_IDENTIFIER_LEN, DEFAULT_PREFIX_LEN};
use credmint_core::lease::{self, DEFAULT_EXPIRATION_FORMAT, DEFAULT_GRACE_FACTOR};
use credmint_core::{
    split_statements, Clock, IdentityGenerator, LeaseError, LeaseResolver, SystemClock,
};

/// Errors in engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid lease settings: {0}")]
    Lease(#[from] LeaseError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lease applied when none is configured in the store.
    #[serde(default = "default_lease_secs")]
    pub default_lease_secs: u64,

    /// Fraction added to the lease when computing the store-side expiration.
    #[serde(default = "default_grace_factor")]
    pub grace_factor: f64,

    /// Characters of the display name kept in a principal.
    #[serde(default = "default_prefix_len")]
    pub display_name_prefix_len: usize,

    /// Identifier length limit of the backing store.
    #[serde(default = "default_max_identifier_len")]
    pub max_identifier_len: usize,

    /// `strftime` format for the `{{expiration}}` placeholder.
    #[serde(default = "default_expiration_format")]
    pub expiration_format: String,

    /// Revocation statements for roles that define none.
    #[serde(default = "default_revocation")]
    pub default_revocation: String,
}

fn default_lease_secs() -> u64 {
    lease::DEFAULT_LEASE.as_secs()
}

fn default_grace_factor() -> f64 {
    DEFAULT_GRACE_FACTOR
}

fn default_prefix_len() -> usize {
    DEFAULT_PREFIX_LEN
}

fn default_max_identifier_len() -> usize {
    DEFAULT_MAX_IDENTIFIER_LEN
}

fn default_expiration_format() -> String {
    DEFAULT_EXPIRATION_FORMAT.to_string()
}

fn default_revocation() -> String {
    "DROP USER IF EXISTS \"{{name}}\"".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_lease_secs: default_lease_secs(),
            grace_factor: default_grace_factor(),
            display_name_prefix_len: default_prefix_len(),
            max_identifier_len: default_max_identifier_len(),
            expiration_format: default_expiration_format(),
            default_revocation: default_revocation(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let resolver = self.lease_resolver()?;
        lease::validate_format(&self.expiration_format)?;
        // The padded default lease must produce a representable expiration.
        resolver
            .resolve(None)
            .expiration(SystemClock.now(), &self.expiration_format)?;

        if self.max_identifier_len == 0 {
            return Err(ConfigError::Invalid(
                "max_identifier_len must be positive".into(),
            ));
        }
        if self.display_name_prefix_len == 0
            || self.display_name_prefix_len >= self.max_identifier_len
        {
            return Err(ConfigError::Invalid(format!(
                "display_name_prefix_len must be between 1 and {}",
                self.max_identifier_len - 1
            )));
        }
        if split_statements(&self.default_revocation).is_empty() {
            return Err(ConfigError::Invalid(
                "default_revocation must contain a statement".into(),
            ));
        }

        if !self.identity_generator().preserves_suffix() {
            tracing::warn!(
                prefix_len = self.display_name_prefix_len,
                max_identifier_len = self.max_identifier_len,
                "principal suffix will be truncated; collision resistance is reduced"
            );
        }
        Ok(())
    }

    pub fn default_lease(&self) -> Duration {
        Duration::from_secs(self.default_lease_secs)
    }

    pub fn lease_resolver(&self) -> Result<LeaseResolver, ConfigError> {
        Ok(LeaseResolver::new(self.default_lease(), self.grace_factor)?)
    }

    pub fn identity_generator(&self) -> IdentityGenerator {
        IdentityGenerator::new(self.display_name_prefix_len, self.max_identifier_len)
    }
}
