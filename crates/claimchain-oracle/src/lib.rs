//! # Claimchain Oracle
//!
//! The chain oracle capability: unspent-output lookup, transaction
//! resolution (display and normalized ids), and broadcast, plus the
//! anchor-transaction builder that embeds a block fingerprint on-chain.
//!
//! Implementations:
//! - [`InsightOracle`] - HTTP client for an insight-style explorer
//! - [`memory::InMemoryOracle`] - deterministic fixture for tests

pub mod error;
pub mod http;
pub mod oracle;
pub mod tx;
pub mod types;

pub use error::OracleError;
pub use http::InsightOracle;
pub use oracle::{memory, ChainOracle};
pub use tx::{build_anchor_transaction, txid_of, AnchorTransaction, ANCHOR_FEE_SATOSHIS};
pub use types::{TransactionInfo, TxOutput, Utxo};
