//! # Credmint Core
//!
//! Pure primitives for Credmint: typed requests, roles, statement templating,
//! identity generation and lease computation.
//!
//! This crate contains no I/O, no storage, no networking. Time and randomness
//! enter only through the [`Clock`] and [`RandomSource`] seams.
//!
//! ## Key Types
//!
//! - [`IssueRequest`] - A validated request for credentials
//! - [`Role`] - A named statement template
//! - [`LeaseResolver`] / [`LeasePolicy`] - Effective lease and padded expiration
//! - [`IdentityGenerator`] - Store-compliant principal and secret generation
//! - [`Bindings`] - Placeholder values for [`template::render`]

pub mod clock;
pub mod error;
pub mod identity;
pub mod lease;
pub mod request;
pub mod role;
pub mod template;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{LeaseError, TemplateError, ValidationError};
pub use identity::{Credential, IdentityGenerator, OsRandom, RandomSource};
pub use lease::{Expiration, LeasePolicy, LeaseResolver, LeaseSource};
pub use request::IssueRequest;
pub use role::{LeaseConfig, Role};
pub use template::{render, render_all, split_statements, Bindings};
pub use types::{DisplayName, Principal, RoleName, Secret};
