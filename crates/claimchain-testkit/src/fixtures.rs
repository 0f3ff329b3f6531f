//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: deterministic keypairs,
//! claim factories, and pre-seeded chain fixtures.

use std::sync::Arc;

use claimchain_core::{fields, Claim, ClaimBuilder, ClaimKind, Keypair};
use claimchain_oracle::memory::InMemoryOracle;
use claimchain_oracle::{TransactionInfo, TxOutput, Utxo};

/// Testnet address whose base58 checksum is valid; pairs with any
/// fixture keypair for transaction construction.
pub const ANCHOR_ADDRESS: &str = "mg6CMr7TkeERALqxwPdqq6ksM2czQzKh5C";

/// A fixture party: a deterministic keypair and claim factories.
pub struct TestParty {
    pub keypair: Keypair,
}

impl TestParty {
    /// Create a party from a deterministic seed byte. Zero is not a
    /// valid scalar; use 1..=255.
    pub fn with_seed(seed: u8) -> Self {
        Self {
            keypair: Keypair::from_seed(&[seed; 32]).expect("nonzero seed is a valid scalar"),
        }
    }

    /// The party's public key, hex.
    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key().to_hex()
    }

    /// A signed WORK claim naming this party as author.
    pub fn work(&self, name: &str) -> Claim {
        ClaimBuilder::new(ClaimKind::Work)
            .attribute(fields::WORK_NAME, name)
            .attribute(fields::AUTHOR, self.public_key_hex())
            .sign(&self.keypair)
    }

    /// A signed TITLE claim transferring a work to `owner`.
    pub fn title(&self, work: &Claim, owner: &str) -> Claim {
        ClaimBuilder::new(ClaimKind::Title)
            .attribute(fields::REFERENCE, work.id.to_hex())
            .attribute(fields::OWNER, owner)
            .sign(&self.keypair)
    }

    /// A signed OFFERING claim selling a work for `amount` coins.
    pub fn offering(&self, work: &Claim, address: &str, amount: &str) -> Claim {
        ClaimBuilder::new(ClaimKind::Offering)
            .attribute(fields::REFERENCE, work.id.to_hex())
            .attribute(fields::PAYMENT_ADDRESS, address)
            .attribute(fields::PAYMENT_AMOUNT, amount)
            .sign(&self.keypair)
    }

    /// A signed LICENSE claim citing a bitcoin payment proof.
    pub fn paid_license(
        &self,
        work: &Claim,
        offering: &Claim,
        owner: &str,
        tx_id: &str,
        ntx_id: &str,
        output_index: u32,
    ) -> Claim {
        ClaimBuilder::new(ClaimKind::License)
            .attribute(fields::REFERENCE, work.id.to_hex())
            .attribute(fields::REFERENCE_OFFERING, offering.id.to_hex())
            .attribute(fields::REFERENCE_OWNER, owner)
            .attribute(fields::LICENSE_HOLDER, self.public_key_hex())
            .attribute(fields::PROOF_TYPE, fields::PROOF_TYPE_BITCOIN)
            .attribute(
                fields::PROOF_VALUE,
                serde_json::json!({
                    "txId": tx_id,
                    "ntxId": ntx_id,
                    "outputIndex": output_index,
                })
                .to_string(),
            )
            .sign(&self.keypair)
    }

    /// A signed self-license over the party's own work.
    pub fn self_license(&self, work: &Claim) -> Claim {
        ClaimBuilder::new(ClaimKind::License)
            .attribute(fields::REFERENCE, work.id.to_hex())
            .attribute(fields::REFERENCE_OWNER, self.public_key_hex())
            .attribute(fields::LICENSE_HOLDER, self.public_key_hex())
            .attribute(fields::PROOF_TYPE, fields::PROOF_TYPE_SELF_OWNED)
            .sign(&self.keypair)
    }
}

/// An in-memory oracle with one spendable output on [`ANCHOR_ADDRESS`].
pub async fn funded_oracle() -> Arc<InMemoryOracle> {
    let oracle = Arc::new(InMemoryOracle::new());
    oracle
        .add_utxo(
            ANCHOR_ADDRESS,
            Utxo {
                txid: "aa".repeat(32),
                vout: 0,
                satoshis: 1_000_000,
                script_pub_key: String::new(),
            },
        )
        .await;
    oracle
}

/// Seed a payment transaction the license hooks can resolve: one output
/// of `value` coins to `address`, reachable by both txid and ntxid.
pub async fn seed_payment(
    oracle: &InMemoryOracle,
    tx_id: &str,
    ntx_id: &str,
    address: &str,
    value: f64,
) {
    oracle
        .add_transaction(TransactionInfo {
            txid: tx_id.to_string(),
            ntxid: ntx_id.to_string(),
            outputs: vec![TxOutput {
                value,
                addresses: vec![address.to_string()],
            }],
        })
        .await;
}
