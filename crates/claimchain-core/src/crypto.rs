//! Cryptographic primitives for claimchain.
//!
//! Wraps secp256k1 ECDSA signing and SHA-256 hashing with strong types.
//! The digest applied to a message before signing depends on the target
//! chain: a single SHA-256 pass for the default protocol, a double pass
//! when the signing target follows the bitcoin transaction convention.

use k256::ecdsa::signature::{DigestSigner, DigestVerifier};
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::CoreError;

/// Selects the message digest used below a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChainKind {
    /// Single SHA-256 pass.
    #[default]
    Default,
    /// Double SHA-256, mirroring bitcoin's transaction-signing convention.
    Bitcoin,
}

impl ChainKind {
    /// Map the wire-level `bitcoin` flag to a chain kind.
    pub fn from_bitcoin_flag(bitcoin: bool) -> Self {
        if bitcoin {
            Self::Bitcoin
        } else {
            Self::Default
        }
    }

    /// The wire-level `bitcoin` flag for this chain kind.
    pub fn is_bitcoin(self) -> bool {
        matches!(self, Self::Bitcoin)
    }

    /// Compute the digest of a message under this chain's convention.
    pub fn digest(self, message: &[u8]) -> [u8; 32] {
        let mut out = [0u8; 32];
        match self {
            Self::Default => out.copy_from_slice(&Sha256::digest(message)),
            Self::Bitcoin => out.copy_from_slice(&Sha256::digest(Sha256::digest(message))),
        }
        out
    }
}

/// The in-progress digest whose final value is `chain.digest(message)`.
fn chain_digest(chain: ChainKind, message: &[u8]) -> Sha256 {
    match chain {
        ChainKind::Default => Sha256::new_with_prefix(message),
        ChainKind::Bitcoin => Sha256::new_with_prefix(Sha256::digest(message)),
    }
}

/// A 33-byte compressed SEC1 secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 33]);

impl PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 33]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Convert to hex string (66 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 33 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 33];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Verify a signature over a message under the given chain convention.
    pub fn verify(
        &self,
        message: &[u8],
        signature: &SignatureBytes,
        chain: ChainKind,
    ) -> Result<(), CoreError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;

        let sig =
            EcdsaSignature::from_slice(&signature.0).map_err(|_| CoreError::InvalidSignature)?;
        // Wallets may emit high-S signatures; normalize before verifying.
        let sig = sig.normalize_s().unwrap_or(sig);

        verifying_key
            .verify_digest(chain_digest(chain, message), &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 33]> for PublicKey {
    fn from(bytes: [u8; 33]) -> Self {
        Self(bytes)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A 64-byte compact ECDSA signature (r || s).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SignatureBytes(pub [u8; 64]);

impl SignatureBytes {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string (compact form, 128 characters).
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 64 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Parse a wire signature, accepting compact or DER hex.
    pub fn from_wire_hex(s: &str) -> Option<Self> {
        let bytes = match hex::decode(s) {
            Ok(b) => b,
            Err(_) => return None,
        };
        if bytes.len() == 64 {
            let mut arr = [0u8; 64];
            arr.copy_from_slice(&bytes);
            return Some(Self(arr));
        }
        let sig = match EcdsaSignature::from_der(&bytes) {
            Ok(s) => s,
            Err(_) => return None,
        };
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&sig.to_bytes());
        Some(Self(arr))
    }

    /// The zero signature (invalid, used as placeholder before signing).
    pub const ZERO: Self = Self([0u8; 64]);
}

impl fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for SignatureBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 64]> for SignatureBytes {
    fn from(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }
}

impl Serialize for SignatureBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SignatureBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A keypair for signing claims and anchor transactions.
///
/// This wraps k256's SigningKey.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from a 32-byte secret scalar.
    ///
    /// Fails for the zero scalar and values at or above the group order.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, CoreError> {
        let signing_key =
            SigningKey::from_slice(seed).map_err(|_| CoreError::InvalidSecretKey)?;
        Ok(Self { signing_key })
    }

    /// Get the compressed public key.
    pub fn public_key(&self) -> PublicKey {
        let point = self.signing_key.verifying_key().to_encoded_point(true);
        let mut arr = [0u8; 33];
        arr.copy_from_slice(point.as_bytes());
        PublicKey(arr)
    }

    /// Sign a message under the given chain convention.
    pub fn sign(&self, message: &[u8], chain: ChainKind) -> SignatureBytes {
        let sig: EcdsaSignature = self.signing_key.sign_digest(chain_digest(chain, message));
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&sig.to_bytes());
        SignatureBytes(arr)
    }

    /// Sign a message, returning the DER encoding (used in script signatures).
    pub fn sign_der(&self, message: &[u8], chain: ChainKind) -> Vec<u8> {
        let sig: EcdsaSignature = self.signing_key.sign_digest(chain_digest(chain, message));
        sig.to_der().as_bytes().to_vec()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public_key())
    }
}

/// Verify a signature over a message against a public key.
///
/// Total over its inputs: any failure (malformed key, malformed signature,
/// digest mismatch) is `false`, never an error. Verification is a trust
/// boundary and must degrade to "unauthenticated" rather than crash.
pub fn verify(
    message: &[u8],
    signature: &SignatureBytes,
    public_key: &PublicKey,
    chain: ChainKind,
) -> bool {
    public_key.verify(message, signature, chain).is_ok()
}

/// Verify a wire-form signature: all three inputs are hex strings.
///
/// Malformed hex in any position yields `false`.
pub fn verify_hex(
    message_hex: &str,
    signature_hex: &str,
    public_key_hex: &str,
    chain: ChainKind,
) -> bool {
    let message = match hex::decode(message_hex) {
        Ok(m) => m,
        Err(_) => return false,
    };
    let signature = match SignatureBytes::from_wire_hex(signature_hex) {
        Some(s) => s,
        None => return false,
    };
    let public_key = match PublicKey::from_hex(public_key_hex) {
        Ok(p) => p,
        Err(_) => return false,
    };
    verify(&message, &signature, &public_key, chain)
}

/// Whether a string is shaped like a compressed secp256k1 public key:
/// exactly 66 hex characters starting with the 02 or 03 point prefix.
///
/// This gates author-profile creation; it does not prove the key is a
/// valid curve point.
pub fn looks_like_public_key(key: &str) -> bool {
    if key.len() != 66 {
        return false;
    }
    if !key.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }
    matches!(&key[..2], "02" | "03")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_sign_verify() {
        let keypair = Keypair::generate();
        let message = b"hello world";
        let signature = keypair.sign(message, ChainKind::Default);

        assert!(verify(
            message,
            &signature,
            &keypair.public_key(),
            ChainKind::Default
        ));

        // Tampered message must fail
        let tampered = b"hello worlD";
        assert!(!verify(
            tampered,
            &signature,
            &keypair.public_key(),
            ChainKind::Default
        ));
    }

    #[test]
    fn test_chain_kind_selects_digest() {
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let message = b"payload";

        let single = keypair.sign(message, ChainKind::Default);
        let double = keypair.sign(message, ChainKind::Bitcoin);

        assert!(verify(message, &single, &keypair.public_key(), ChainKind::Default));
        assert!(verify(message, &double, &keypair.public_key(), ChainKind::Bitcoin));

        // Crossing conventions must fail
        assert!(!verify(message, &single, &keypair.public_key(), ChainKind::Bitcoin));
        assert!(!verify(message, &double, &keypair.public_key(), ChainKind::Default));
    }

    #[test]
    fn test_double_digest_is_sha256_of_sha256() {
        let message = b"abc";
        let single = ChainKind::Default.digest(message);
        let double = ChainKind::Bitcoin.digest(message);
        let mut expected = [0u8; 32];
        expected.copy_from_slice(&Sha256::digest(single));
        assert_eq!(double, expected);
    }

    #[test]
    fn test_flipped_signature_byte_fails() {
        let keypair = Keypair::from_seed(&[0x07; 32]).unwrap();
        let message = b"attested content";
        let signature = keypair.sign(message, ChainKind::Default);

        for i in 0..64 {
            let mut bad = signature.0;
            bad[i] ^= 0x01;
            assert!(
                !verify(message, &SignatureBytes(bad), &keypair.public_key(), ChainKind::Default),
                "flipping byte {} must invalidate the signature",
                i
            );
        }
    }

    #[test]
    fn test_verify_hex_malformed_inputs_are_false() {
        let keypair = Keypair::generate();
        let message = b"msg";
        let signature = keypair.sign(message, ChainKind::Default);
        let pk_hex = keypair.public_key().to_hex();

        assert!(verify_hex(
            &hex::encode(message),
            &signature.to_hex(),
            &pk_hex,
            ChainKind::Default
        ));

        // Bad hex, bad lengths, truncated keys: all false, never a panic
        assert!(!verify_hex("zz", &signature.to_hex(), &pk_hex, ChainKind::Default));
        assert!(!verify_hex(&hex::encode(message), "abcd", &pk_hex, ChainKind::Default));
        assert!(!verify_hex(&hex::encode(message), &signature.to_hex(), "02ab", ChainKind::Default));
    }

    #[test]
    fn test_der_wire_signature_accepted() {
        let keypair = Keypair::from_seed(&[0x33; 32]).unwrap();
        let message = b"wire payload";
        let der = keypair.sign_der(message, ChainKind::Default);

        assert!(verify_hex(
            &hex::encode(message),
            &hex::encode(der),
            &keypair.public_key().to_hex(),
            ChainKind::Default
        ));
    }

    #[test]
    fn test_keypair_deterministic_from_seed() {
        let seed = [0x42u8; 32];
        let kp1 = Keypair::from_seed(&seed).unwrap();
        let kp2 = Keypair::from_seed(&seed).unwrap();
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_from_seed_rejects_zero_scalar() {
        assert!(Keypair::from_seed(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_public_key_is_compressed() {
        let keypair = Keypair::generate();
        let pk = keypair.public_key();
        assert!(pk.0[0] == 0x02 || pk.0[0] == 0x03);
        assert!(looks_like_public_key(&pk.to_hex()));
    }

    #[test]
    fn test_looks_like_public_key() {
        assert!(looks_like_public_key(&format!("02{}", "ab".repeat(32))));
        assert!(looks_like_public_key(&format!("03{}", "cd".repeat(32))));

        // Wrong prefix
        assert!(!looks_like_public_key(&format!("04{}", "ab".repeat(32))));
        // Wrong length
        assert!(!looks_like_public_key("02abcd"));
        // Not hex
        assert!(!looks_like_public_key(&format!("02{}", "zz".repeat(32))));
        // Empty
        assert!(!looks_like_public_key(""));
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        let keypair = Keypair::generate();
        let pk = keypair.public_key();
        let hex = pk.to_hex();
        let recovered = PublicKey::from_hex(&hex).unwrap();
        assert_eq!(pk, recovered);
    }
}
