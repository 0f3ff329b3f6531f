//! # Claimchain Bus
//!
//! The announcement channel: a thin adapter over an external message bus.
//!
//! Two delivery contracts, both best-effort:
//! - [`Announcer::announce_block`] - at-least-attempt; failure surfaces as
//!   an `Err` to the caller, who logs and swallows it
//! - [`Announcer::publish_notification`] - fire-and-forget "please sign"
//!   events for the remote signing coordinator
//!
//! The anchor transaction is the durable record of a block; announcements
//! only speed up propagation, so no delivery guarantee is made.

pub mod error;
pub mod memory;
pub mod nats;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use claimchain_core::Block;

pub use error::BusError;
pub use memory::RecordingAnnouncer;
pub use nats::NatsAnnouncer;

/// A "please sign" event published when a sign request names a
/// notification target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// The public key the signing device registered under.
    pub pub_key: String,

    /// The sign request awaiting a signature.
    pub request_id: String,
}

/// The announcement channel capability.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Announcer: Send + Sync {
    /// Announce an assembled block to downstream consumers.
    ///
    /// At-least-attempt: an `Err` means this attempt failed and the caller
    /// decides whether that matters (the publisher logs and swallows it).
    async fn announce_block(&self, block: &Block) -> Result<(), BusError>;

    /// Publish a sign-request notification. Fire-and-forget.
    async fn publish_notification(&self, event: &NotificationEvent) -> Result<(), BusError>;
}

/// Wire form of a block announcement.
///
/// Carries the canonical block bytes so consumers can re-derive and
/// verify the block id and anchor fingerprint independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockAnnouncement {
    /// Block id, hex.
    pub id: String,

    /// Canonical block encoding, hex.
    pub block: String,
}

impl BlockAnnouncement {
    /// Build the announcement payload for a block.
    pub fn from_block(block: &Block) -> Self {
        Self {
            id: block.id.to_hex(),
            block: hex::encode(claimchain_core::canonical_block_bytes(block)),
        }
    }
}
