//! # Claimchain Rules
//!
//! The certification rule engine: per-claim-kind validation hooks over
//! accumulated domain state.
//!
//! Certification decides whether a signature-checked claim is
//! *authoritative*: a WORK claim registers a work, a TITLE claim records
//! ownership, a LICENSE claim is checked against its payment proof (on
//! chain, through a [`ChainOracle`]), and so on. Accepted claims mutate
//! the [`DomainState`] and emit [`DomainEvent`]s; invalid claims come
//! back as [`CertificationOutcome::Rejected`] rather than errors.

pub mod attributes;
pub mod engine;
pub mod error;
pub mod events;
pub mod state;

pub use attributes::{
    LicenseAttributes, OfferingAttributes, ProofValue, TitleAttributes, WorkAttributes,
};
pub use engine::{CertificationEngine, CertificationOutcome, PAYMENT_TOLERANCE};
pub use error::RulesError;
pub use events::DomainEvent;
pub use state::{DomainState, License, Offering, Profile, Work};

#[doc(no_inline)]
pub use claimchain_oracle::ChainOracle;
