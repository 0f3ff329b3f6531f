//! In-memory announcer doubles for testing.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use claimchain_core::Block;

use crate::error::BusError;
use crate::{Announcer, NotificationEvent};

/// Records every announcement; can be flipped into a failing mode to test
/// the best-effort contract.
#[derive(Default)]
pub struct RecordingAnnouncer {
    blocks: Mutex<Vec<Block>>,
    notifications: Mutex<Vec<NotificationEvent>>,
    fail: AtomicBool,
}

impl RecordingAnnouncer {
    /// Create a recording announcer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make all subsequent publishes fail.
    pub fn fail_publishes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Blocks announced so far.
    pub async fn announced_blocks(&self) -> Vec<Block> {
        self.blocks.lock().await.clone()
    }

    /// Notifications published so far.
    pub async fn notifications(&self) -> Vec<NotificationEvent> {
        self.notifications.lock().await.clone()
    }
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce_block(&self, block: &Block) -> Result<(), BusError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BusError::Publish("announcer disabled by test".into()));
        }
        self.blocks.lock().await.push(block.clone());
        Ok(())
    }

    async fn publish_notification(&self, event: &NotificationEvent) -> Result<(), BusError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BusError::Publish("announcer disabled by test".into()));
        }
        self.notifications.lock().await.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimchain_core::{ClaimBuilder, ClaimKind, Keypair};

    #[tokio::test]
    async fn test_records_then_fails() {
        let bus = RecordingAnnouncer::new();
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let block = Block::from_claims(vec![ClaimBuilder::new(ClaimKind::Work)
            .attribute("name", "Ligeia")
            .sign(&keypair)]);

        bus.announce_block(&block).await.unwrap();
        assert_eq!(bus.announced_blocks().await.len(), 1);

        bus.fail_publishes();
        assert!(bus.announce_block(&block).await.is_err());
        assert_eq!(bus.announced_blocks().await.len(), 1);
    }
}
