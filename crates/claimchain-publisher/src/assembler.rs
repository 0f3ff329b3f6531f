//! Block assembly and anchoring.
//!
//! `publish` is the tail of the claim pipeline: certify upstream, then
//! create_block, anchor_block, announce. The anchor transaction is the
//! durable record; the announcement is best-effort and never fails a
//! publish.

use std::sync::Arc;

use tracing::{info, warn};

use claimchain_bus::Announcer;
use claimchain_core::{fields, now_millis, Block, Claim, ClaimBuilder, ClaimKind, Keypair};
use claimchain_oracle::{build_anchor_transaction, ChainOracle};

use crate::error::PublishError;
use crate::fingerprint::block_fingerprint;

/// The durable identifiers of an anchored block.
#[derive(Debug, Clone)]
pub struct AnchorHandle {
    /// Display txid of the broadcast anchor transaction.
    pub txid: String,

    /// Normalized transaction id (stable across signature malleation).
    pub ntxid: String,

    /// The fingerprint embedded in the transaction's data output.
    pub fingerprint: [u8; 32],
}

/// Assembles claim batches into blocks and anchors them on chain.
pub struct Publisher {
    keypair: Keypair,
    anchor_address: String,
    oracle: Arc<dyn ChainOracle>,
    bus: Arc<dyn Announcer>,
}

impl Publisher {
    /// Create a publisher anchoring from `anchor_address`, which must be
    /// the P2PKH address of `keypair`.
    pub fn new(
        keypair: Keypair,
        anchor_address: impl Into<String>,
        oracle: Arc<dyn ChainOracle>,
        bus: Arc<dyn Announcer>,
    ) -> Self {
        Self {
            keypair,
            anchor_address: anchor_address.into(),
            oracle,
            bus,
        }
    }

    /// The publisher's signing keypair.
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Assemble a block: every input claim gets a publisher-signed
    /// CERTIFICATE appended, originals first, certificates as a trailing
    /// run in the same order.
    pub fn create_block(&self, claims: &[Claim]) -> Block {
        let certificates = claims.iter().map(|claim| {
            ClaimBuilder::new(ClaimKind::Certificate)
                .attribute(fields::REFERENCE, claim.id.to_hex())
                .attribute(fields::CERTIFICATION_TIME, now_millis().to_string())
                .sign(&self.keypair)
        });
        Block::from_claims(claims.iter().cloned().chain(certificates).collect())
    }

    /// Anchor a block: embed its fingerprint in a funding transaction
    /// spending the anchor address's unspent outputs back to itself, and
    /// broadcast it.
    pub async fn anchor_block(&self, block: &Block) -> Result<AnchorHandle, PublishError> {
        let fingerprint = block_fingerprint(block);
        let utxos = self.oracle.unspent_outputs(&self.anchor_address).await?;
        let transaction =
            build_anchor_transaction(&fingerprint, &utxos, &self.anchor_address, &self.keypair)?;
        let txid = self.oracle.broadcast(&transaction.bytes).await?;
        Ok(AnchorHandle {
            txid,
            ntxid: transaction.ntxid,
            fingerprint,
        })
    }

    /// Publish certified claims: assemble, anchor, announce.
    ///
    /// Returns the block's full claim list, synthesized certificates
    /// included. An announcement failure is logged and swallowed; the
    /// anchor transaction is the source of truth.
    pub async fn publish(&self, claims: Vec<Claim>) -> Result<Vec<Claim>, PublishError> {
        if claims.is_empty() {
            return Err(PublishError::EmptyBlock);
        }

        let block = self.create_block(&claims);
        let handle = self.anchor_block(&block).await?;
        info!(
            block = %block.id,
            txid = %handle.txid,
            ntxid = %handle.ntxid,
            fingerprint = %hex::encode(handle.fingerprint),
            "block anchored"
        );

        if let Err(err) = self.bus.announce_block(&block).await {
            warn!(block = %block.id, error = %err, "block announcement failed");
        }

        Ok(block.claims)
    }
}
