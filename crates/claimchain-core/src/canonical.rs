//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats
//!
//! The canonical encoding is critical: claim and block ids are hashes of
//! these bytes, so the same claim must produce identical bytes across all
//! processes.

use ciborium::value::Value;

use crate::claim::{Block, Claim, ClaimKind};
use crate::crypto::{PublicKey, SignatureBytes};
use crate::error::CoreError;
use crate::types::{BlockId, ClaimId};

/// Claim field keys (integer keys for compact encoding).
///
/// Keys 0-23 encode as single bytes in CBOR. The claim id is never
/// encoded: it is derived from the content bytes.
mod keys {
    pub const PUBLIC_KEY: u64 = 0;
    pub const KIND: u64 = 1;
    pub const ATTRIBUTES: u64 = 2;
    pub const SIGNATURE: u64 = 3;
}

/// Block field keys.
mod block_keys {
    pub const ID: u64 = 0;
    pub const CLAIMS: u64 = 1;
}

/// Encode a claim's content (public key, kind, attributes) to canonical
/// bytes. The claim id is the SHA-256 of these bytes.
pub fn content_bytes(claim: &Claim) -> Vec<u8> {
    let value = claim_to_cbor_value(claim, false);
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value);
    buf
}

/// Encode an entire claim (content + signature) to canonical bytes.
pub fn canonical_bytes(claim: &Claim) -> Vec<u8> {
    let value = claim_to_cbor_value(claim, true);
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value);
    buf
}

/// Encode an ordered claim set to canonical bytes (array of full claim
/// encodings). The block id is the SHA-256 of these bytes.
pub fn canonical_block_claims_bytes(claims: &[Claim]) -> Vec<u8> {
    let arr: Vec<Value> = claims
        .iter()
        .map(|c| Value::Bytes(canonical_bytes(c)))
        .collect();
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &Value::Array(arr));
    buf
}

/// Encode a block (id + claims) to canonical bytes.
///
/// This is the serialization anchored on-chain and announced on the bus;
/// consumers re-derive the id from the claim set and verify it matches.
pub fn canonical_block_bytes(block: &Block) -> Vec<u8> {
    let claims: Vec<Value> = block
        .claims
        .iter()
        .map(|c| Value::Bytes(canonical_bytes(c)))
        .collect();
    let value = Value::Map(vec![
        (
            Value::Integer(block_keys::ID.into()),
            Value::Bytes(block.id.as_bytes().to_vec()),
        ),
        (
            Value::Integer(block_keys::CLAIMS.into()),
            Value::Array(claims),
        ),
    ]);
    let mut buf = Vec::new();
    encode_value_to(&mut buf, &value);
    buf
}

/// Convert a claim to a CBOR Value (map with integer keys).
fn claim_to_cbor_value(claim: &Claim, with_signature: bool) -> Value {
    let mut entries = Vec::with_capacity(4);

    entries.push((
        Value::Integer(keys::PUBLIC_KEY.into()),
        Value::Bytes(claim.public_key.as_bytes().to_vec()),
    ));
    entries.push((
        Value::Integer(keys::KIND.into()),
        Value::Integer(claim.kind.to_u16().into()),
    ));

    // Attributes as a text-keyed map; canonical key order is enforced by
    // the encoder.
    let attrs: Vec<(Value, Value)> = claim
        .attributes
        .iter()
        .map(|(k, v)| (Value::Text(k.clone()), Value::Text(v.clone())))
        .collect();
    entries.push((Value::Integer(keys::ATTRIBUTES.into()), Value::Map(attrs)));

    if with_signature {
        entries.push((
            Value::Integer(keys::SIGNATURE.into()),
            Value::Bytes(claim.signature.as_bytes().to_vec()),
        ));
    }

    Value::Map(entries)
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => panic!("floats not supported in canonical encoding"),
        _ => panic!("unsupported CBOR value type"),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode an array (major type 4).
fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

/// Decode a claim from canonical bytes, re-deriving its id.
///
/// The signature field is optional in the input (unsigned claims decode
/// with a zero signature); the id is always recomputed from content, so
/// a decoded claim's id never depends on what the sender stored.
pub fn decode_claim(bytes: &[u8]) -> Result<Claim, CoreError> {
    let cursor = std::io::Cursor::new(bytes);
    let value: Value =
        ciborium::from_reader(cursor).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    cbor_value_to_claim(&value)
}

/// Decode a block from canonical bytes, verifying the stored id against
/// the re-derived one.
pub fn decode_block(bytes: &[u8]) -> Result<Block, CoreError> {
    let cursor = std::io::Cursor::new(bytes);
    let value: Value =
        ciborium::from_reader(cursor).map_err(|e| CoreError::DecodingError(e.to_string()))?;

    let map = match &value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedBlock("expected map".into())),
    };

    let stored_id = match get_key(map, block_keys::ID) {
        Some(Value::Bytes(b)) if b.len() == 32 => {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(b);
            BlockId(arr)
        }
        _ => return Err(CoreError::MalformedBlock("invalid id".into())),
    };

    let claims = match get_key(map, block_keys::CLAIMS) {
        Some(Value::Array(arr)) => {
            let mut claims = Vec::with_capacity(arr.len());
            for item in arr {
                match item {
                    Value::Bytes(b) => claims.push(decode_claim(b)?),
                    _ => return Err(CoreError::MalformedBlock("invalid claim entry".into())),
                }
            }
            claims
        }
        _ => return Err(CoreError::MalformedBlock("invalid claims".into())),
    };

    let derived = Block::compute_id(&claims);
    if derived != stored_id {
        return Err(CoreError::MalformedBlock(format!(
            "id mismatch: stored {}, derived {}",
            stored_id, derived
        )));
    }

    Ok(Block {
        id: stored_id,
        claims,
    })
}

/// Get a map value by integer key.
fn get_key(map: &[(Value, Value)], key: u64) -> Option<&Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
        .map(|(_, v)| v)
}

/// Convert a CBOR Value (map) back to a Claim.
fn cbor_value_to_claim(value: &Value) -> Result<Claim, CoreError> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::MalformedClaim("expected map".into())),
    };

    let public_key = match get_key(map, keys::PUBLIC_KEY) {
        Some(Value::Bytes(b)) if b.len() == 33 => {
            let mut arr = [0u8; 33];
            arr.copy_from_slice(b);
            PublicKey(arr)
        }
        _ => return Err(CoreError::MalformedClaim("invalid public key".into())),
    };

    let kind = match get_key(map, keys::KIND) {
        Some(Value::Integer(i)) => {
            let n: i128 = (*i).into();
            ClaimKind::from_u16(n as u16)
                .ok_or_else(|| CoreError::MalformedClaim(format!("invalid kind: {}", n)))?
        }
        _ => return Err(CoreError::MalformedClaim("missing kind".into())),
    };

    let attributes = match get_key(map, keys::ATTRIBUTES) {
        Some(Value::Map(entries)) => {
            let mut attrs = std::collections::BTreeMap::new();
            for (k, v) in entries {
                match (k, v) {
                    (Value::Text(key), Value::Text(val)) => {
                        attrs.insert(key.clone(), val.clone());
                    }
                    _ => {
                        return Err(CoreError::MalformedClaim(
                            "attributes must map text to text".into(),
                        ))
                    }
                }
            }
            attrs
        }
        _ => return Err(CoreError::MalformedClaim("missing attributes".into())),
    };

    let signature = match get_key(map, keys::SIGNATURE) {
        Some(Value::Bytes(b)) if b.len() == 64 => {
            let mut arr = [0u8; 64];
            arr.copy_from_slice(b);
            SignatureBytes(arr)
        }
        None => SignatureBytes::ZERO,
        _ => return Err(CoreError::MalformedClaim("invalid signature".into())),
    };

    let mut claim = Claim {
        id: ClaimId::ZERO,
        public_key,
        signature,
        kind,
        attributes,
    };
    claim.id = claim.compute_id();
    Ok(claim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ClaimBuilder;
    use crate::crypto::Keypair;
    use crate::fields;

    fn sample_claim() -> Claim {
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        ClaimBuilder::new(ClaimKind::Work)
            .attribute(fields::WORK_NAME, "Annabel Lee")
            .attribute(fields::AUTHOR, keypair.public_key().to_hex())
            .sign(&keypair)
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        let claim = sample_claim();
        assert_eq!(canonical_bytes(&claim), canonical_bytes(&claim));
        assert_eq!(content_bytes(&claim), content_bytes(&claim));
    }

    #[test]
    fn test_claim_roundtrip_preserves_id() {
        let claim = sample_claim();
        let bytes = canonical_bytes(&claim);
        let decoded = decode_claim(&bytes).unwrap();
        assert_eq!(decoded, claim);
        assert_eq!(decoded.id, claim.id);
        assert!(decoded.verify());
    }

    #[test]
    fn test_unsigned_claim_decodes_with_zero_signature() {
        let claim = sample_claim();
        let unsigned = Claim {
            signature: SignatureBytes::ZERO,
            ..claim.clone()
        };
        let bytes = content_bytes(&unsigned);
        let decoded = decode_claim(&bytes).unwrap();
        assert_eq!(decoded.signature, SignatureBytes::ZERO);
        // Same content, same id
        assert_eq!(decoded.id, claim.id);
    }

    #[test]
    fn test_block_roundtrip() {
        let keypair = Keypair::from_seed(&[0x07; 32]).unwrap();
        let c1 = sample_claim();
        let c2 = ClaimBuilder::new(ClaimKind::Offering)
            .attribute(fields::PAYMENT_ADDRESS, "mg6CMr7TkeERALqxwPdqq6ksM2czQzKh5C")
            .attribute(fields::PAYMENT_AMOUNT, "0.1")
            .sign(&keypair);
        let block = Block::from_claims(vec![c1, c2]);

        let bytes = canonical_block_bytes(&block);
        let decoded = decode_block(&bytes).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_block_decode_rejects_id_mismatch() {
        let block = Block::from_claims(vec![sample_claim()]);
        let forged = Block {
            id: BlockId::from_bytes([0xee; 32]),
            claims: block.claims.clone(),
        };
        let bytes = canonical_block_bytes(&forged);
        assert!(decode_block(&bytes).is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_claim(b"not cbor at all").is_err());
        assert!(decode_claim(&[]).is_err());
        assert!(decode_block(&[0xa0]).is_err());
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();
        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);
    }

    #[test]
    fn test_attribute_key_ordering() {
        // Attribute maps sort by encoded key bytes: shorter keys first,
        // then lexicographic.
        let keypair = Keypair::from_seed(&[0x11; 32]).unwrap();
        let a = ClaimBuilder::new(ClaimKind::Profile)
            .attribute("b", "2")
            .attribute("a", "1")
            .sign(&keypair);
        let b = ClaimBuilder::new(ClaimKind::Profile)
            .attribute("a", "1")
            .attribute("b", "2")
            .sign(&keypair);
        assert_eq!(canonical_bytes(&a), canonical_bytes(&b));
        assert_eq!(a.id, b.id);
    }
}
