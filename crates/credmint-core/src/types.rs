//! Strong type definitions for Credmint.
//!
//! Names that cross the caller boundary are validated newtypes so that the
//! rest of the engine never handles unchecked text.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Maximum length of a role name.
pub const MAX_ROLE_NAME_LEN: usize = 128;

/// Maximum length, in bytes, of a caller display name.
///
/// Only the first few characters ever reach a principal; the bound exists to
/// reject absurd input before any component runs.
pub const MAX_DISPLAY_NAME_LEN: usize = 512;

/// A role name: one or more ASCII word characters (`[A-Za-z0-9_]`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Validate and wrap a role name.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyRoleName);
        }
        if name.len() > MAX_ROLE_NAME_LEN {
            return Err(ValidationError::RoleNameTooLong {
                max: MAX_ROLE_NAME_LEN,
            });
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
        {
            return Err(ValidationError::InvalidRoleName(c));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoleName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleName> for String {
    fn from(name: RoleName) -> Self {
        name.0
    }
}

impl fmt::Debug for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoleName({})", self.0)
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Free-text caller display name, used only to flavor the principal name.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct DisplayName(String);

impl DisplayName {
    /// Validate and wrap a display name.
    ///
    /// Any printable text is accepted; control characters are rejected.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.len() > MAX_DISPLAY_NAME_LEN {
            return Err(ValidationError::DisplayNameTooLong {
                max: MAX_DISPLAY_NAME_LEN,
            });
        }
        if name.chars().any(char::is_control) {
            return Err(ValidationError::InvalidDisplayName);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisplayName({:?})", self.0)
    }
}

/// The identity name created in the backing store for one issuance.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Wrap an already store-compliant principal name.
    pub fn from_string(name: String) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({})", self.0)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The secret (password) bound to a principal.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    /// Access the secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_name_accepts_word_characters() {
        assert!(RoleName::new("readonly").is_ok());
        assert!(RoleName::new("app_rw_2").is_ok());
    }

    #[test]
    fn test_role_name_rejects_invalid_input() {
        assert_eq!(RoleName::new(""), Err(ValidationError::EmptyRoleName));
        assert_eq!(
            RoleName::new("read-only"),
            Err(ValidationError::InvalidRoleName('-'))
        );
        assert_eq!(
            RoleName::new("a/b"),
            Err(ValidationError::InvalidRoleName('/'))
        );
        assert!(matches!(
            RoleName::new("x".repeat(MAX_ROLE_NAME_LEN + 1)),
            Err(ValidationError::RoleNameTooLong { .. })
        ));
    }

    #[test]
    fn test_role_name_deserialize_validates() {
        let ok: RoleName = serde_json::from_str("\"reader\"").unwrap();
        assert_eq!(ok.as_str(), "reader");
        assert!(serde_json::from_str::<RoleName>("\"bad name\"").is_err());
    }

    #[test]
    fn test_display_name_bounds() {
        assert!(DisplayName::new("token-ci").is_ok());
        assert!(DisplayName::new("").is_ok());
        assert_eq!(
            DisplayName::new("a\nb"),
            Err(ValidationError::InvalidDisplayName)
        );
        assert!(matches!(
            DisplayName::new("x".repeat(MAX_DISPLAY_NAME_LEN + 1)),
            Err(ValidationError::DisplayNameTooLong { .. })
        ));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::from_string("hunter2".into());
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert_eq!(secret.expose(), "hunter2");
    }
}
