//! # Credmint Testkit
//!
//! Testing utilities for Credmint.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: In-memory stores seeded with standard roles, a frozen clock
//!   and deterministic randomness
//! - **Generators**: Proptest strategies for role names, display names and leases
//! - **Scenarios**: Role templates with known outcomes, from clean commits to
//!   mid-transaction rollbacks
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use credmint_testkit::fixtures::{TestFixture, READONLY_ROLE};
//!
//! let fixture = TestFixture::new().await;
//! let envelope = fixture.engine().issue_raw(READONLY_ROLE, "ci").await?;
//! assert!(fixture.backend.has_principal(envelope.data.username.as_str()));
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use credmint_testkit::generators::IssueParams;
//!
//! proptest! {
//!     #[test]
//!     fn principal_is_bounded(params: IssueParams) {
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod scenarios;

pub use fixtures::{FixedRandom, SeededRandom, TestFixture};
pub use generators::IssueParams;
pub use scenarios::{all_scenarios, verify_all_scenarios, Outcome, RoleScenario};
