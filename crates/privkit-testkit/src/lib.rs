//! # privkit Testkit
//!
//! Testing utilities for privkit.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a toolkit wired over a known key, in memory or in a
//!   throwaway directory
//! - **Generators**: Proptest strategies for identifiers, consent
//!   preferences and JSON user records
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use privkit_testkit::generators::preferences;
//!
//! proptest! {
//!     #[test]
//!     fn stored_preferences_read_back(prefs in preferences()) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use privkit_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let consent = fixture.toolkit().consent();
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{TestFixture, FIXTURE_SECRET};
pub use generators::{identifier, preferences, user_fields, user_records};
