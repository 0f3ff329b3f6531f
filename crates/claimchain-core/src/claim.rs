//! Claim and Block: the atomic units of attestation.
//!
//! A claim is an immutable, signed assertion. Its id is the hash of its
//! canonical content encoding, so no attribute may change once the claim
//! is signed. A block is an ordered, hash-identified batch of claims.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::canonical::{canonical_bytes, canonical_block_claims_bytes, content_bytes};
use crate::crypto::{ChainKind, Keypair, PublicKey, SignatureBytes};
use crate::types::{BlockId, ClaimId};
use sha2::{Digest, Sha256};

/// The kind of claim, determining which certification hook applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ClaimKind {
    /// A creative work.
    Work = 0x0001,
    /// An ownership transfer for a work.
    Title = 0x0002,
    /// A license over a work.
    License = 0x0003,
    /// An offer to license a work for a price.
    Offering = 0x0004,
    /// Display attributes bound to a public key.
    Profile = 0x0005,
    /// A publisher-synthesized timestamp over another claim.
    Certificate = 0x0006,
    /// A revocation of a previous claim.
    Revocation = 0x0007,
}

impl ClaimKind {
    /// Convert to u16 for canonical encoding.
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Try to parse from u16.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::Work),
            0x0002 => Some(Self::Title),
            0x0003 => Some(Self::License),
            0x0004 => Some(Self::Offering),
            0x0005 => Some(Self::Profile),
            0x0006 => Some(Self::Certificate),
            0x0007 => Some(Self::Revocation),
            _ => None,
        }
    }

    /// The wire name used in JSON bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "CreativeWork",
            Self::Title => "Title",
            Self::License => "License",
            Self::Offering => "Offering",
            Self::Profile => "Profile",
            Self::Certificate => "Certificate",
            Self::Revocation => "Revocation",
        }
    }

    /// Parse a wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CreativeWork" => Some(Self::Work),
            "Title" => Some(Self::Title),
            "License" => Some(Self::License),
            "Offering" => Some(Self::Offering),
            "Profile" => Some(Self::Profile),
            "Certificate" => Some(Self::Certificate),
            "Revocation" => Some(Self::Revocation),
            _ => None,
        }
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ClaimKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ClaimKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown claim kind: {}", s)))
    }
}

/// A signed, typed assertion with a content-derived id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    /// Content-derived id (SHA-256 of the canonical content encoding).
    pub id: ClaimId,

    /// The submitter's compressed public key.
    pub public_key: PublicKey,

    /// ECDSA signature over the claim id bytes.
    pub signature: SignatureBytes,

    /// The kind of claim.
    #[serde(rename = "type")]
    pub kind: ClaimKind,

    /// Open attribute map. Immutable once the claim is signed.
    pub attributes: BTreeMap<String, String>,
}

impl Claim {
    /// Compute the content-derived id of this claim.
    ///
    /// The id commits to the public key, kind, and attribute set; it does
    /// not depend on the signature or any previously-stored id.
    pub fn compute_id(&self) -> ClaimId {
        let bytes = content_bytes(self);
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&Sha256::digest(&bytes));
        ClaimId(arr)
    }

    /// Encode this claim to its canonical byte form (content + signature).
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_bytes(self)
    }

    /// Verify this claim: the id must match the content and the signature
    /// must verify over the id bytes.
    pub fn verify(&self) -> bool {
        if self.compute_id() != self.id {
            return false;
        }
        crate::crypto::verify(
            self.id.as_bytes(),
            &self.signature,
            &self.public_key,
            ChainKind::Default,
        )
    }

    /// Look up an attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Attach a signature to an unsigned (decoded) claim, re-deriving the id.
    pub fn with_signature(mut self, signature: SignatureBytes) -> Self {
        self.signature = signature;
        self.id = self.compute_id();
        self
    }
}

/// An ordered, hash-identified batch of claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Deterministic hash over the ordered claim set.
    pub id: BlockId,

    /// The claims, in submission order. Frozen once anchored.
    pub claims: Vec<Claim>,
}

impl Block {
    /// Build a block from an ordered claim set, deriving its id.
    pub fn from_claims(claims: Vec<Claim>) -> Self {
        let id = Self::compute_id(&claims);
        Self { id, claims }
    }

    /// Compute the block id for an ordered claim set.
    ///
    /// Two processes computing a block from the same claims independently
    /// produce the same id.
    pub fn compute_id(claims: &[Claim]) -> BlockId {
        let bytes = canonical_block_claims_bytes(claims);
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&Sha256::digest(&bytes));
        BlockId(arr)
    }
}

/// Builder for creating signed claims.
pub struct ClaimBuilder {
    kind: ClaimKind,
    attributes: BTreeMap<String, String>,
}

impl ClaimBuilder {
    /// Start building a claim of the given kind.
    pub fn new(kind: ClaimKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
        }
    }

    /// Set an attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set multiple attributes at once.
    pub fn attributes(mut self, attrs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.attributes.extend(attrs);
        self
    }

    /// Derive the id and sign the claim.
    ///
    /// The id is computed once the attribute set is final, then signed;
    /// the claim is immutable from here on.
    pub fn sign(self, keypair: &Keypair) -> Claim {
        let mut claim = Claim {
            id: ClaimId::ZERO,
            public_key: keypair.public_key(),
            signature: SignatureBytes::ZERO,
            kind: self.kind,
            attributes: self.attributes,
        };
        claim.id = claim.compute_id();
        claim.signature = keypair.sign(claim.id.as_bytes(), ChainKind::Default);
        claim
    }
}

/// Current time as unix milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;

    fn work_claim(keypair: &Keypair) -> Claim {
        ClaimBuilder::new(ClaimKind::Work)
            .attribute(fields::WORK_NAME, "The Raven")
            .attribute(fields::AUTHOR, keypair.public_key().to_hex())
            .sign(keypair)
    }

    #[test]
    fn test_claim_kind_roundtrip() {
        for kind in [
            ClaimKind::Work,
            ClaimKind::Title,
            ClaimKind::License,
            ClaimKind::Offering,
            ClaimKind::Profile,
            ClaimKind::Certificate,
            ClaimKind::Revocation,
        ] {
            assert_eq!(ClaimKind::from_u16(kind.to_u16()), Some(kind));
            assert_eq!(ClaimKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ClaimKind::from_u16(0x0042), None);
        assert_eq!(ClaimKind::parse("Work"), None);
    }

    #[test]
    fn test_signed_claim_verifies() {
        let keypair = Keypair::generate();
        let claim = work_claim(&keypair);
        assert!(claim.verify());
        assert_eq!(claim.compute_id(), claim.id);
    }

    #[test]
    fn test_id_stable_under_rederivation() {
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let claim = work_claim(&keypair);
        assert_eq!(claim.compute_id(), claim.compute_id());
    }

    #[test]
    fn test_tampered_attribute_changes_id() {
        let keypair = Keypair::generate();
        let claim = work_claim(&keypair);
        let mut tampered = claim.clone();
        tampered
            .attributes
            .insert(fields::WORK_NAME.to_string(), "The Craven".to_string());
        assert_ne!(tampered.compute_id(), claim.id);
        assert!(!tampered.verify());
    }

    #[test]
    fn test_id_independent_of_signature() {
        let keypair = Keypair::generate();
        let claim = work_claim(&keypair);
        let mut resigned = claim.clone();
        resigned.signature = SignatureBytes::ZERO;
        assert_eq!(resigned.compute_id(), claim.id);
    }

    #[test]
    fn test_block_id_deterministic() {
        let keypair = Keypair::from_seed(&[0x07; 32]).unwrap();
        let c1 = work_claim(&keypair);
        let c2 = ClaimBuilder::new(ClaimKind::Profile)
            .attribute("displayName", "E. A. Poe")
            .sign(&keypair);

        let a = Block::from_claims(vec![c1.clone(), c2.clone()]);
        let b = Block::from_claims(vec![c1.clone(), c2.clone()]);
        assert_eq!(a.id, b.id);

        // Order is part of the identity
        let reversed = Block::from_claims(vec![c2, c1]);
        assert_ne!(a.id, reversed.id);
    }

    #[test]
    fn test_claim_json_shape() {
        let keypair = Keypair::from_seed(&[0x11; 32]).unwrap();
        let claim = work_claim(&keypair);
        let json = serde_json::to_value(&claim).unwrap();
        assert_eq!(json["type"], "CreativeWork");
        assert_eq!(json["publicKey"], keypair.public_key().to_hex());
        assert_eq!(json["id"], claim.id.to_hex());

        let back: Claim = serde_json::from_value(json).unwrap();
        assert_eq!(back, claim);
    }
}
