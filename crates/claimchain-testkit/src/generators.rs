//! Proptest generators for property-based testing.

use proptest::prelude::*;

use claimchain_core::{Claim, ClaimBuilder, ClaimId, ClaimKind, Keypair};

/// Generate a keypair from a valid secret scalar.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_filter_map("valid secp256k1 scalar", |seed| {
        Keypair::from_seed(&seed).ok()
    })
}

/// Generate a random ClaimId.
pub fn claim_id() -> impl Strategy<Value = ClaimId> {
    any::<[u8; 32]>().prop_map(ClaimId::from_bytes)
}

/// Generate a ClaimKind.
pub fn claim_kind() -> impl Strategy<Value = ClaimKind> {
    prop_oneof![
        Just(ClaimKind::Work),
        Just(ClaimKind::Title),
        Just(ClaimKind::License),
        Just(ClaimKind::Offering),
        Just(ClaimKind::Profile),
        Just(ClaimKind::Certificate),
        Just(ClaimKind::Revocation),
    ]
}

/// Generate a plausible attribute map: short printable keys and values.
pub fn attributes() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-zA-Z]{1,16}", "[ -~]{0,64}"), 0..10)
}

/// Generate a fully-signed claim of any kind.
pub fn signed_claim() -> impl Strategy<Value = Claim> {
    (keypair(), claim_kind(), attributes()).prop_map(|(keypair, kind, attrs)| {
        ClaimBuilder::new(kind).attributes(attrs).sign(&keypair)
    })
}

/// Generate an ordered batch of signed claims.
pub fn claim_batch(max: usize) -> impl Strategy<Value = Vec<Claim>> {
    prop::collection::vec(signed_claim(), 1..=max)
}
