//! # Claimchain Testkit
//!
//! Testing utilities for claimchain.
//!
//! - **Fixtures**: deterministic parties, claim factories, and pre-funded
//!   chain doubles for integration tests
//! - **Generators**: proptest strategies for property-based testing
//!
//! ```rust,ignore
//! use claimchain_testkit::fixtures::{funded_oracle, TestParty, ANCHOR_ADDRESS};
//!
//! let author = TestParty::with_seed(0x42);
//! let work = author.work("The Raven");
//! let offering = author.offering(&work, ANCHOR_ADDRESS, "0.1");
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{funded_oracle, seed_payment, TestParty, ANCHOR_ADDRESS};
