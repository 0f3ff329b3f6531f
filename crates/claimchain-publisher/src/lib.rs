//! # Claimchain Publisher
//!
//! The block assembler and anchoring publisher: turns certified claim
//! batches into tamper-evident blocks, anchors each block into the chain
//! through a funding transaction carrying its fingerprint, and announces
//! it on the bus.
//!
//! The HTTP surface ([`api`]) is the front door of the whole pipeline:
//! claims come in signed, get certified by the rule engine, and the
//! survivors leave as one anchored [`claimchain_core::Block`].

pub mod api;
pub mod assembler;
pub mod error;
pub mod fingerprint;

pub use api::{router, AppState};
pub use assembler::{AnchorHandle, Publisher};
pub use error::PublishError;
pub use fingerprint::{block_fingerprint, PIECE_LENGTH};
