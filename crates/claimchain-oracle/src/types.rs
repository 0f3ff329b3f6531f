//! Chain data types seen through the oracle.

use serde::{Deserialize, Serialize};

/// An unspent transaction output funding the anchor address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Transaction id (display hex, big-endian).
    pub txid: String,

    /// Output index within the transaction.
    pub vout: u32,

    /// Value in satoshis.
    pub satoshis: u64,

    /// The locking script, hex encoded.
    pub script_pub_key: String,
}

/// One output of a resolved transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Value in coins.
    pub value: f64,

    /// Addresses the locking script pays to.
    pub addresses: Vec<String>,
}

/// A transaction resolved through the oracle, reduced to what payment
/// validation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInfo {
    /// Transaction id.
    pub txid: String,

    /// Normalized transaction id, invariant under signature malleation.
    pub ntxid: String,

    /// Outputs in order.
    pub outputs: Vec<TxOutput>,
}
