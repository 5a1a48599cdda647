//! Error types for Credmint Core.

use thiserror::Error;

/// Errors produced while splitting or rendering a statement template.
///
/// A template error always points at a broken role definition, never at the
/// caller's request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template contains no statements")]
    NoStatements,

    #[error("statement {index} is empty after substitution")]
    Empty { index: usize },

    #[error("statement {index} is malformed: {reason}")]
    Malformed { index: usize, reason: String },
}

/// Validation errors for caller-supplied request fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("role name must not be empty")]
    EmptyRoleName,

    #[error("role name exceeds maximum length of {max}")]
    RoleNameTooLong { max: usize },

    #[error("role name contains invalid character {0:?}")]
    InvalidRoleName(char),

    #[error("display name exceeds maximum length of {max}")]
    DisplayNameTooLong { max: usize },

    #[error("display name contains a control character")]
    InvalidDisplayName,
}

/// Errors computing a lease or its expiration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LeaseError {
    #[error("grace factor must be a finite, non-negative number, got {0}")]
    InvalidGraceFactor(f64),

    #[error("lease duration is out of range")]
    OutOfRange,

    #[error("invalid expiration format: {0:?}")]
    InvalidFormat(String),
}
