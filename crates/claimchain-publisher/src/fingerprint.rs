//! Block anchor fingerprints.
//!
//! The identifier embedded in the anchor transaction is not a bare hash
//! of the block bytes: the canonical block encoding is wrapped in a
//! bencoded info dictionary and the SHA-256 of that encoding is the
//! fingerprint. Downstream retrieval keys on this infohash-style form,
//! so the wrapping step must stay byte-stable.

use sha2::{Digest, Sha256};

use claimchain_core::{canonical_block_bytes, Block};

/// Chunk size the content is digested over inside the info dictionary.
pub const PIECE_LENGTH: usize = 16_384;

/// Compute the anchor fingerprint of a block.
pub fn block_fingerprint(block: &Block) -> [u8; 32] {
    let content = canonical_block_bytes(block);
    info_dict_digest(&content, &block.id.to_hex())
}

/// SHA-256 over the bencoded info dictionary of a named byte buffer.
pub fn info_dict_digest(content: &[u8], name: &str) -> [u8; 32] {
    Sha256::digest(info_dict(content, name)).into()
}

/// Bencode `{length, name, pieces}`. Keys are already in sorted order,
/// as bencoding requires.
fn info_dict(content: &[u8], name: &str) -> Vec<u8> {
    let mut pieces = Vec::with_capacity(32 * (content.len() / PIECE_LENGTH + 1));
    for chunk in content.chunks(PIECE_LENGTH) {
        pieces.extend_from_slice(&Sha256::digest(chunk));
    }

    let mut out = Vec::new();
    out.push(b'd');
    out.extend_from_slice(b"6:length");
    out.extend_from_slice(format!("i{}e", content.len()).as_bytes());
    out.extend_from_slice(b"4:name");
    out.extend_from_slice(format!("{}:", name.len()).as_bytes());
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b"6:pieces");
    out.extend_from_slice(format!("{}:", pieces.len()).as_bytes());
    out.extend_from_slice(&pieces);
    out.push(b'e');
    out
}
