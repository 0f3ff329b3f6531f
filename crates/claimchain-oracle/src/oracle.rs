//! The chain oracle capability.
//!
//! The oracle is the system's only window onto the blockchain: unspent
//! output lookup, transaction resolution, and broadcast. It is a trust
//! boundary, not a validator — the core trusts what the oracle reports.

use async_trait::async_trait;

use crate::error::OracleError;
use crate::types::{TransactionInfo, Utxo};

/// Result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;

/// Chain oracle: unspent-output lookup, transaction lookup, broadcast.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait ChainOracle: Send + Sync {
    /// Fetch the unspent outputs funding an address.
    async fn unspent_outputs(&self, address: &str) -> Result<Vec<Utxo>>;

    /// Resolve a transaction by its display txid.
    ///
    /// Returns None when the transaction is unknown; an Err means the
    /// oracle itself could not answer.
    async fn transaction(&self, txid: &str) -> Result<Option<TransactionInfo>>;

    /// Resolve a normalized transaction id to the display txid.
    ///
    /// The ntxid is stable across signature malleation, so wallets quote
    /// it in payment proofs before the transaction confirms.
    async fn resolve_ntxid(&self, ntxid: &str) -> Result<Option<String>>;

    /// Broadcast a raw transaction; returns the display txid.
    async fn broadcast(&self, raw_tx: &[u8]) -> Result<String>;
}

/// A deterministic in-memory oracle for testing.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::{Mutex, RwLock};

    use crate::tx::txid_of;

    /// In-memory oracle backed by seeded fixtures.
    #[derive(Default)]
    pub struct InMemoryOracle {
        utxos: RwLock<HashMap<String, Vec<Utxo>>>,
        transactions: RwLock<HashMap<String, TransactionInfo>>,
        ntxids: RwLock<HashMap<String, String>>,
        broadcasts: Mutex<Vec<Vec<u8>>>,
        fail_broadcast: AtomicBool,
    }

    impl InMemoryOracle {
        /// Create an empty oracle.
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed an unspent output for an address.
        pub async fn add_utxo(&self, address: &str, utxo: Utxo) {
            self.utxos
                .write()
                .await
                .entry(address.to_string())
                .or_default()
                .push(utxo);
        }

        /// Seed a resolved transaction, indexing its ntxid.
        pub async fn add_transaction(&self, tx: TransactionInfo) {
            self.ntxids
                .write()
                .await
                .insert(tx.ntxid.clone(), tx.txid.clone());
            self.transactions.write().await.insert(tx.txid.clone(), tx);
        }

        /// Make all subsequent broadcasts fail.
        pub fn fail_broadcasts(&self) {
            self.fail_broadcast.store(true, Ordering::SeqCst);
        }

        /// Raw transactions broadcast so far.
        pub async fn broadcasts(&self) -> Vec<Vec<u8>> {
            self.broadcasts.lock().await.clone()
        }
    }

    #[async_trait]
    impl ChainOracle for InMemoryOracle {
        async fn unspent_outputs(&self, address: &str) -> Result<Vec<Utxo>> {
            Ok(self
                .utxos
                .read()
                .await
                .get(address)
                .cloned()
                .unwrap_or_default())
        }

        async fn transaction(&self, txid: &str) -> Result<Option<TransactionInfo>> {
            Ok(self.transactions.read().await.get(txid).cloned())
        }

        async fn resolve_ntxid(&self, ntxid: &str) -> Result<Option<String>> {
            Ok(self.ntxids.read().await.get(ntxid).cloned())
        }

        async fn broadcast(&self, raw_tx: &[u8]) -> Result<String> {
            if self.fail_broadcast.load(Ordering::SeqCst) {
                return Err(OracleError::BroadcastRejected(
                    "broadcast disabled by test".into(),
                ));
            }
            self.broadcasts.lock().await.push(raw_tx.to_vec());
            Ok(txid_of(raw_tx))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_seeded_utxos_are_returned() {
            let oracle = InMemoryOracle::new();
            let utxo = Utxo {
                txid: "aa".repeat(32),
                vout: 0,
                satoshis: 50_000,
                script_pub_key: "76a914".into(),
            };
            oracle.add_utxo("addr1", utxo.clone()).await;

            assert_eq!(oracle.unspent_outputs("addr1").await.unwrap(), vec![utxo]);
            assert!(oracle.unspent_outputs("addr2").await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_ntxid_resolution() {
            let oracle = InMemoryOracle::new();
            oracle
                .add_transaction(TransactionInfo {
                    txid: "11".repeat(32),
                    ntxid: "22".repeat(32),
                    outputs: vec![],
                })
                .await;

            assert_eq!(
                oracle.resolve_ntxid(&"22".repeat(32)).await.unwrap(),
                Some("11".repeat(32))
            );
            assert_eq!(oracle.resolve_ntxid("unknown").await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_failing_broadcast() {
            let oracle = InMemoryOracle::new();
            oracle.fail_broadcasts();
            assert!(matches!(
                oracle.broadcast(&[0x01]).await,
                Err(OracleError::BroadcastRejected(_))
            ));
            assert!(oracle.broadcasts().await.is_empty());
        }
    }
}
