//! The caller-facing issuance request.

use crate::error::ValidationError;
use crate::types::{DisplayName, RoleName};

/// A validated request for credentials.
///
/// Construction is the only place caller input is checked; every component
/// downstream works on the typed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    pub role: RoleName,
    pub display_name: DisplayName,
}

impl IssueRequest {
    /// Validate raw caller input.
    pub fn new(role: &str, display_name: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            role: RoleName::new(role)?,
            display_name: DisplayName::new(display_name)?,
        })
    }

    /// Build from already-validated parts.
    pub fn from_parts(role: RoleName, display_name: DisplayName) -> Self {
        Self { role, display_name }
    }
}
