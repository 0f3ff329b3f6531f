//! Anchor transaction construction.
//!
//! Builds the minimal-fee funding transaction that embeds a block
//! fingerprint in an OP_RETURN output and spends the anchor address's
//! unspent outputs back to itself. Legacy (pre-segwit) serialization
//! with SIGHASH_ALL signing.

use claimchain_core::{ChainKind, Keypair};
use sha2::{Digest, Sha256};

use crate::error::OracleError;
use crate::types::Utxo;

/// Fixed fee paid by every anchor transaction, in satoshis.
pub const ANCHOR_FEE_SATOSHIS: u64 = 10_000;

const SIGHASH_ALL: u8 = 0x01;
const SEQUENCE_FINAL: u32 = 0xffff_ffff;

// Script opcodes
const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const OP_RETURN: u8 = 0x6a;

/// A fully-signed anchor transaction ready to broadcast.
#[derive(Debug, Clone)]
pub struct AnchorTransaction {
    /// Serialized transaction bytes.
    pub bytes: Vec<u8>,

    /// Display transaction id (reversed double SHA-256 of `bytes`).
    pub txid: String,

    /// Normalized transaction id (signatures blanked before hashing).
    pub ntxid: String,
}

/// Build and sign an anchor transaction.
///
/// Spends every supplied output, pays the fingerprint into an OP_RETURN
/// output, and returns the remainder minus [`ANCHOR_FEE_SATOSHIS`] to the
/// anchor address. All inputs must be P2PKH outputs owned by `keypair`.
pub fn build_anchor_transaction(
    fingerprint: &[u8; 32],
    utxos: &[Utxo],
    anchor_address: &str,
    keypair: &Keypair,
) -> Result<AnchorTransaction, OracleError> {
    if utxos.is_empty() {
        return Err(OracleError::InsufficientFunds {
            available: 0,
            required: ANCHOR_FEE_SATOSHIS,
        });
    }

    let available: u64 = utxos.iter().map(|u| u.satoshis).sum();
    if available <= ANCHOR_FEE_SATOSHIS {
        return Err(OracleError::InsufficientFunds {
            available,
            required: ANCHOR_FEE_SATOSHIS + 1,
        });
    }
    let change = available - ANCHOR_FEE_SATOSHIS;

    let payload = address_payload(anchor_address)?;
    let outputs = vec![
        (0u64, op_return_script(fingerprint)),
        (change, p2pkh_script(&payload)),
    ];

    let inputs = decode_inputs(utxos)?;

    // Sign each input against its own locking script (SIGHASH_ALL).
    let mut script_sigs = Vec::with_capacity(inputs.len());
    for i in 0..inputs.len() {
        let mut preimage = serialize(&inputs, &outputs, |j| {
            if i == j {
                inputs[j].script_pub_key.clone()
            } else {
                Vec::new()
            }
        });
        preimage.extend_from_slice(&(SIGHASH_ALL as u32).to_le_bytes());

        let mut sig = keypair.sign_der(&preimage, ChainKind::Bitcoin);
        sig.push(SIGHASH_ALL);

        let mut script = Vec::with_capacity(sig.len() + 36);
        push_data(&mut script, &sig);
        push_data(&mut script, keypair.public_key().as_bytes());
        script_sigs.push(script);
    }

    let bytes = serialize(&inputs, &outputs, |j| script_sigs[j].clone());
    let ntxid_bytes = serialize(&inputs, &outputs, |_| Vec::new());

    Ok(AnchorTransaction {
        txid: txid_of(&bytes),
        ntxid: txid_of(&ntxid_bytes),
        bytes,
    })
}

/// The display transaction id of serialized transaction bytes: the
/// byte-reversed hex of their double SHA-256.
pub fn txid_of(raw_tx: &[u8]) -> String {
    let mut digest: Vec<u8> = Sha256::digest(Sha256::digest(raw_tx)).to_vec();
    digest.reverse();
    hex::encode(digest)
}

/// Decode a base58check address into its 20-byte hash160 payload.
pub fn address_payload(address: &str) -> Result<[u8; 20], OracleError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|e| OracleError::InvalidAddress(format!("{}: {}", address, e)))?;
    // version byte + hash160 + 4 checksum bytes
    if bytes.len() != 25 {
        return Err(OracleError::InvalidAddress(format!(
            "{}: wrong length {}",
            address,
            bytes.len()
        )));
    }
    let checksum = Sha256::digest(Sha256::digest(&bytes[..21]));
    if checksum[..4] != bytes[21..] {
        return Err(OracleError::InvalidAddress(format!(
            "{}: bad checksum",
            address
        )));
    }
    let mut payload = [0u8; 20];
    payload.copy_from_slice(&bytes[1..21]);
    Ok(payload)
}

/// Standard pay-to-pubkey-hash locking script.
fn p2pkh_script(hash160: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    push_data(&mut script, hash160);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

/// Provably-unspendable data output carrying the fingerprint.
fn op_return_script(data: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(data.len() + 2);
    script.push(OP_RETURN);
    push_data(&mut script, data);
    script
}

/// Direct push of up to 75 bytes.
fn push_data(script: &mut Vec<u8>, data: &[u8]) {
    debug_assert!(data.len() < 76);
    script.push(data.len() as u8);
    script.extend_from_slice(data);
}

struct Input {
    /// Previous txid in internal (reversed) byte order.
    prev_txid: [u8; 32],
    vout: u32,
    script_pub_key: Vec<u8>,
}

fn decode_inputs(utxos: &[Utxo]) -> Result<Vec<Input>, OracleError> {
    utxos
        .iter()
        .map(|u| {
            let mut txid_bytes = hex::decode(&u.txid)
                .map_err(|e| OracleError::Decode(format!("utxo txid {}: {}", u.txid, e)))?;
            if txid_bytes.len() != 32 {
                return Err(OracleError::Decode(format!(
                    "utxo txid {}: wrong length",
                    u.txid
                )));
            }
            txid_bytes.reverse();
            let mut prev_txid = [0u8; 32];
            prev_txid.copy_from_slice(&txid_bytes);

            let script_pub_key = hex::decode(&u.script_pub_key)
                .map_err(|e| OracleError::Decode(format!("utxo script: {}", e)))?;

            Ok(Input {
                prev_txid,
                vout: u.vout,
                script_pub_key,
            })
        })
        .collect()
}

/// Serialize a transaction, choosing each input's scriptSig via
/// `script_sig_for` (empty for the normalized form, the locking script
/// for sighash preimages, the real signature for the final bytes).
fn serialize(
    inputs: &[Input],
    outputs: &[(u64, Vec<u8>)],
    script_sig_for: impl Fn(usize) -> Vec<u8>,
) -> Vec<u8> {
    let mut buf = Vec::new();

    // version
    buf.extend_from_slice(&1u32.to_le_bytes());

    write_varint(&mut buf, inputs.len() as u64);
    for (i, input) in inputs.iter().enumerate() {
        buf.extend_from_slice(&input.prev_txid);
        buf.extend_from_slice(&input.vout.to_le_bytes());
        let script_sig = script_sig_for(i);
        write_varint(&mut buf, script_sig.len() as u64);
        buf.extend_from_slice(&script_sig);
        buf.extend_from_slice(&SEQUENCE_FINAL.to_le_bytes());
    }

    write_varint(&mut buf, outputs.len() as u64);
    for (value, script) in outputs {
        buf.extend_from_slice(&value.to_le_bytes());
        write_varint(&mut buf, script.len() as u64);
        buf.extend_from_slice(script);
    }

    // locktime
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf
}

fn write_varint(buf: &mut Vec<u8>, n: u64) {
    if n < 0xfd {
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&n.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Testnet address with a valid base58 checksum.
    const ADDRESS: &str = "mg6CMr7TkeERALqxwPdqq6ksM2czQzKh5C";

    fn funded_utxo(keypair: &Keypair, satoshis: u64) -> Utxo {
        // Lock to the keypair's own hash160 so the sighash path is realistic
        let hash160 = {
            let mut h = [0u8; 20];
            let digest = Sha256::digest(keypair.public_key().as_bytes());
            h.copy_from_slice(&digest[..20]);
            h
        };
        Utxo {
            txid: "ab".repeat(32),
            vout: 1,
            satoshis,
            script_pub_key: hex::encode(p2pkh_script(&hash160)),
        }
    }

    #[test]
    fn test_address_payload_roundtrip() {
        let payload = address_payload(ADDRESS).unwrap();
        assert_eq!(payload.len(), 20);

        // Re-encode and compare
        let mut full = vec![0x6f]; // testnet p2pkh version
        full.extend_from_slice(&payload);
        let checksum = Sha256::digest(Sha256::digest(&full));
        full.extend_from_slice(&checksum[..4]);
        assert_eq!(bs58::encode(full).into_string(), ADDRESS);
    }

    #[test]
    fn test_address_payload_rejects_tampering() {
        assert!(address_payload("mg6CMr7TkeERALqxwPdqq6ksM2czQzKh5D").is_err());
        assert!(address_payload("not an address").is_err());
        assert!(address_payload("").is_err());
    }

    #[test]
    fn test_anchor_transaction_embeds_fingerprint() {
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let fingerprint = [0xcd; 32];
        let tx = build_anchor_transaction(
            &fingerprint,
            &[funded_utxo(&keypair, 100_000)],
            ADDRESS,
            &keypair,
        )
        .unwrap();

        // OP_RETURN + 32-byte push must appear in the serialization
        let mut marker = vec![OP_RETURN, 32];
        marker.extend_from_slice(&fingerprint);
        assert!(tx
            .bytes
            .windows(marker.len())
            .any(|w| w == marker.as_slice()));
    }

    #[test]
    fn test_change_is_total_minus_fee() {
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let tx = build_anchor_transaction(
            &[0u8; 32],
            &[funded_utxo(&keypair, 100_000)],
            ADDRESS,
            &keypair,
        )
        .unwrap();

        let change = (100_000u64 - ANCHOR_FEE_SATOSHIS).to_le_bytes();
        assert!(tx.bytes.windows(8).any(|w| w == change));
    }

    #[test]
    fn test_insufficient_funds() {
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let err = build_anchor_transaction(
            &[0u8; 32],
            &[funded_utxo(&keypair, ANCHOR_FEE_SATOSHIS)],
            ADDRESS,
            &keypair,
        )
        .unwrap_err();
        assert!(matches!(err, OracleError::InsufficientFunds { .. }));

        let err = build_anchor_transaction(&[0u8; 32], &[], ADDRESS, &keypair).unwrap_err();
        assert!(matches!(err, OracleError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_ntxid_invariant_under_resigning() {
        // Two keypairs spending identical outputs produce different txids
        // but identical ntxids (signatures are blanked).
        let utxo = Utxo {
            txid: "ab".repeat(32),
            vout: 0,
            satoshis: 100_000,
            script_pub_key: "76a914".to_string() + &"00".repeat(20) + "88ac",
        };
        let a = build_anchor_transaction(
            &[0x11; 32],
            &[utxo.clone()],
            ADDRESS,
            &Keypair::from_seed(&[0x01; 32]).unwrap(),
        )
        .unwrap();
        let b = build_anchor_transaction(
            &[0x11; 32],
            &[utxo],
            ADDRESS,
            &Keypair::from_seed(&[0x02; 32]).unwrap(),
        )
        .unwrap();

        assert_ne!(a.txid, b.txid);
        assert_eq!(a.ntxid, b.ntxid);
    }

    #[test]
    fn test_txid_is_reversed_double_sha() {
        let raw = [0x01, 0x02, 0x03];
        let mut expected: Vec<u8> = Sha256::digest(Sha256::digest(raw)).to_vec();
        expected.reverse();
        assert_eq!(txid_of(&raw), hex::encode(expected));
    }
}
