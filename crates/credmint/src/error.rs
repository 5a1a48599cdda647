//! Error types for the engine.

use credmint_core::{LeaseError, RoleName, TemplateError, ValidationError};
use credmint_store::StoreError;
use thiserror::Error;

/// Errors from the transactional executor.
///
/// Every variant raised after `begin` succeeded is returned only after the
/// transaction was rolled back.
#[derive(Debug, Error)]
pub enum ExecError {
    /// No transaction could be opened; no statement was attempted.
    #[error("failed to open transaction: {0}")]
    Begin(#[source] StoreError),

    /// Statement `index` could not be prepared.
    #[error("failed to prepare statement {index}: {source}")]
    Prepare {
        index: usize,
        #[source]
        source: StoreError,
    },

    /// Statement `index` failed while executing.
    #[error("statement {index} failed: {source}")]
    Execute {
        index: usize,
        #[source]
        source: StoreError,
    },

    /// Every statement ran but the commit failed.
    #[error("commit failed: {0}")]
    Commit(#[source] StoreError),

    /// The task driving the transaction did not finish.
    #[error("execution task aborted: {0}")]
    Aborted(String),
}

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request failed boundary validation.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    /// No role with this name exists.
    #[error("unknown role: {0}")]
    UnknownRole(RoleName),

    /// Reading role or lease configuration failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The lease could not be turned into an expiration.
    #[error("lease error: {0}")]
    Lease(#[from] LeaseError),

    /// The role's statement template is broken.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// The backing store could not be reached.
    #[error("backing store connection failed: {0}")]
    Connection(#[source] StoreError),

    /// A statement failed; the transaction was rolled back.
    #[error("statement {index} failed: {source}")]
    Execution {
        index: usize,
        #[source]
        source: StoreError,
    },

    /// The commit failed; no credential exists.
    #[error("commit failed: {0}")]
    Commit(#[source] StoreError),

    /// The unit of work was aborted before it finished.
    #[error("issuance aborted: {0}")]
    Aborted(String),
}

impl From<ExecError> for EngineError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::Begin(source) => EngineError::Connection(source),
            ExecError::Prepare { index, source } | ExecError::Execute { index, source } => {
                EngineError::Execution { index, source }
            }
            ExecError::Commit(source) => EngineError::Commit(source),
            ExecError::Aborted(msg) => EngineError::Aborted(msg),
        }
    }
}

/// Machine-checkable code of a caller-facing error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicErrorCode {
    InvalidRequest,
    UnknownRole,
    Internal,
}

impl PublicErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnknownRole => "unknown_role",
            Self::Internal => "internal",
        }
    }
}

/// What a caller is allowed to see about a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicError {
    pub code: PublicErrorCode,
    pub message: String,
}

const INTERNAL_MESSAGE: &str = "credential issuance failed";

impl EngineError {
    /// Whether the caller, not the system, is at fault.
    pub fn is_user_error(&self) -> bool {
        matches!(self, EngineError::InvalidRequest(_) | EngineError::UnknownRole(_))
    }

    /// The caller-facing form of this error.
    ///
    /// System failures collapse to one opaque message; the detail stays in
    /// the logs.
    pub fn public(&self) -> PublicError {
        match self {
            EngineError::InvalidRequest(e) => PublicError {
                code: PublicErrorCode::InvalidRequest,
                message: e.to_string(),
            },
            EngineError::UnknownRole(name) => PublicError {
                code: PublicErrorCode::UnknownRole,
                message: format!("unknown role: {}", name),
            },
            _ => PublicError {
                code: PublicErrorCode::Internal,
                message: INTERNAL_MESSAGE.to_string(),
            },
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
