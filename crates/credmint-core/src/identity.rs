//! Principal and secret generation.
//!
//! A principal is `prefix-uuid`, where the prefix is the caller's display
//! name reduced to identifier-safe characters and cut to
//! [`DEFAULT_PREFIX_LEN`]. The prefix is cut *before* the suffix is appended
//! so the random suffix, which is the only source of uniqueness, survives
//! long display names. The final cut to [`DEFAULT_MAX_IDENTIFIER_LEN`] is a
//! safety net for tighter store limits: if it ever removes suffix characters,
//! collision resistance drops with every character removed. Keep
//! `prefix_len + 1 + 36 <= max_identifier_len` to avoid that.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::{DisplayName, Principal, Secret};

/// Maximum identifier length of the backing store.
pub const DEFAULT_MAX_IDENTIFIER_LEN: usize = 63;

/// Maximum length of the display-name prefix.
pub const DEFAULT_PREFIX_LEN: usize = 26;

/// Prefix used when the display name has no usable characters.
pub const EMPTY_PREFIX: &str = "anon";

/// Source of random UUIDs for principal suffixes and secrets.
pub trait RandomSource: Send + Sync + fmt::Debug {
    fn uuid(&self) -> Uuid;
}

/// Random source backed by the operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// A freshly minted credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub principal: Principal,
    pub secret: Secret,
    pub expires_at: DateTime<Utc>,
    /// `expires_at` rendered for substitution into statements.
    pub expiration: String,
}

/// Generates principal names and secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityGenerator {
    prefix_len: usize,
    max_identifier_len: usize,
}

impl IdentityGenerator {
    pub fn new(prefix_len: usize, max_identifier_len: usize) -> Self {
        Self {
            prefix_len,
            max_identifier_len,
        }
    }

    pub fn max_identifier_len(&self) -> usize {
        self.max_identifier_len
    }

    /// Whether a generated principal always keeps its full random suffix.
    pub fn preserves_suffix(&self) -> bool {
        self.prefix_len + 1 + uuid::fmt::Hyphenated::LENGTH <= self.max_identifier_len
    }

    /// Generate a principal and secret for `display_name`.
    pub fn generate(
        &self,
        display_name: &DisplayName,
        random: &dyn RandomSource,
    ) -> (Principal, Secret) {
        let prefix = self.prefix(display_name);
        let mut principal = format!("{}-{}", prefix, random.uuid().hyphenated());
        // Everything is ASCII at this point, so byte truncation is safe.
        principal.truncate(self.max_identifier_len);

        let secret = random.uuid().hyphenated().to_string();

        (
            Principal::from_string(principal),
            Secret::from_string(secret),
        )
    }

    fn prefix(&self, display_name: &DisplayName) -> String {
        let prefix: String = display_name
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .take(self.prefix_len)
            .collect();

        if prefix.is_empty() {
            EMPTY_PREFIX.chars().take(self.prefix_len.max(1)).collect()
        } else {
            prefix
        }
    }
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX_LEN, DEFAULT_MAX_IDENTIFIER_LEN)
    }
}
