//! Error types for the certification engine.
//!
//! Ordinary invalid claims never produce an error here; they come back as
//! [`crate::CertificationOutcome::Rejected`]. Errors are reserved for
//! client protocol violations and external-dependency failures.

use thiserror::Error;

use claimchain_oracle::OracleError;

/// Hard errors raised by the certification engine.
#[derive(Debug, Error)]
pub enum RulesError {
    /// An OFFERING claim was submitted without a reference and without any
    /// WORK claim in the batch to borrow one from. A client protocol
    /// violation, not a domain fact.
    #[error("an offering claim was submitted without any work claim")]
    OfferingWithoutWork,

    /// The chain oracle could not answer a lookup it needed to answer.
    #[error("oracle failure: {0}")]
    Oracle(#[from] OracleError),
}
