//! Error types for the chain oracle.

use thiserror::Error;

/// Errors raised by oracle implementations and the transaction builder.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("http error: {0}")]
    Http(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("insufficient funds: {available} satoshis available, {required} required")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),

    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}
