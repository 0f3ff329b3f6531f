//! # Claimchain Core
//!
//! Pure primitives for claimchain: claims, blocks, and canonicalization.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Claim`] - A signed, typed assertion with a content-derived id
//! - [`Block`] - An ordered, hash-identified batch of claims
//! - [`ClaimKind`] - Discriminator for certification dispatch
//! - [`ChainKind`] - Selects the message digest (single vs double SHA-256)
//!
//! ## Canonicalization
//!
//! All claims and blocks are encoded using deterministic CBOR. See the
//! [`canonical`] module.

pub mod canonical;
pub mod claim;
pub mod crypto;
pub mod error;
pub mod fields;
pub mod types;
pub mod validation;

pub use canonical::{
    canonical_block_bytes, canonical_bytes, content_bytes, decode_block, decode_claim,
};
pub use claim::{now_millis, Block, Claim, ClaimBuilder, ClaimKind};
pub use crypto::{
    looks_like_public_key, verify, verify_hex, ChainKind, Keypair, PublicKey, SignatureBytes,
};
pub use error::{CoreError, ValidationError};
pub use types::{BlockId, ClaimId};
pub use validation::validate_claim;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_attributes() -> impl Strategy<Value = Vec<(String, String)>> {
        proptest::collection::vec(("[a-z]{1,12}", "[ -~]{0,40}"), 0..8)
    }

    proptest! {
        #[test]
        fn claim_id_survives_roundtrip(attrs in arb_attributes(), seed in 1u8..=255) {
            let keypair = Keypair::from_seed(&[seed; 32]).unwrap();
            let claim = ClaimBuilder::new(ClaimKind::Work)
                .attributes(attrs)
                .sign(&keypair);

            let decoded = decode_claim(&canonical_bytes(&claim)).unwrap();
            prop_assert_eq!(decoded.id, claim.id);
            prop_assert_eq!(decoded, claim);
        }

        #[test]
        fn block_id_depends_only_on_claim_set(attrs in arb_attributes(), seed in 1u8..=255) {
            let keypair = Keypair::from_seed(&[seed; 32]).unwrap();
            let claim = ClaimBuilder::new(ClaimKind::Profile)
                .attributes(attrs)
                .sign(&keypair);

            let a = Block::from_claims(vec![claim.clone()]);
            let b = Block::from_claims(vec![claim]);
            prop_assert_eq!(a.id, b.id);
        }

        #[test]
        fn flipped_message_byte_never_verifies(
            message in proptest::collection::vec(any::<u8>(), 1..64),
            flip in any::<usize>(),
            seed in 1u8..=255,
        ) {
            let keypair = Keypair::from_seed(&[seed; 32]).unwrap();
            let signature = keypair.sign(&message, ChainKind::Default);
            prop_assert!(verify(&message, &signature, &keypair.public_key(), ChainKind::Default));

            let mut tampered = message.clone();
            let i = flip % tampered.len();
            tampered[i] ^= 0x01;
            prop_assert!(!verify(&tampered, &signature, &keypair.public_key(), ChainKind::Default));
        }
    }
}
