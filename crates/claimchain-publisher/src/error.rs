//! Error types for the publisher.

use thiserror::Error;

use claimchain_oracle::OracleError;

/// Errors raised while assembling or anchoring a block.
#[derive(Debug, Error)]
pub enum PublishError {
    /// No claims survived to publish.
    #[error("nothing to publish")]
    EmptyBlock,

    /// UTXO lookup, transaction construction, or broadcast failed. A
    /// broadcast failure is terminal for this publish attempt; it is not
    /// retried.
    #[error("anchoring failed: {0}")]
    Anchoring(#[from] OracleError),
}
