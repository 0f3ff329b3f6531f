//! Property tests over assembled blocks.

use std::sync::Arc;

use proptest::prelude::*;

use claimchain_bus::RecordingAnnouncer;
use claimchain_core::{fields, ClaimKind, Keypair};
use claimchain_oracle::memory::InMemoryOracle;
use claimchain_publisher::Publisher;
use claimchain_testkit::generators::claim_batch;
use claimchain_testkit::ANCHOR_ADDRESS;

fn publisher() -> Publisher {
    Publisher::new(
        Keypair::from_seed(&[0x42; 32]).unwrap(),
        ANCHOR_ADDRESS,
        Arc::new(InMemoryOracle::new()),
        Arc::new(RecordingAnnouncer::new()),
    )
}

proptest! {
    // Every input claim keeps its position and gains exactly one
    // publisher-signed certificate in the trailing run, whatever the
    // batch contents.
    #[test]
    fn assembled_block_keeps_order_and_certifies_every_claim(
        claims in claim_batch(6),
    ) {
        let publisher = publisher();
        let block = publisher.create_block(&claims);

        prop_assert_eq!(block.claims.len(), claims.len() * 2);
        for (i, claim) in claims.iter().enumerate() {
            prop_assert_eq!(&block.claims[i], claim);

            let certificate = &block.claims[claims.len() + i];
            prop_assert_eq!(certificate.kind, ClaimKind::Certificate);
            let claim_id_hex = claim.id.to_hex();
            prop_assert_eq!(
                certificate.attribute(fields::REFERENCE),
                Some(claim_id_hex.as_str())
            );
            prop_assert!(certificate.verify());
        }
    }
}
