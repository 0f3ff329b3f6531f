//! NATS-backed announcer.

use std::time::Duration;

use async_nats::ConnectOptions;
use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use claimchain_core::Block;

use crate::error::BusError;
use crate::{Announcer, BlockAnnouncement, NotificationEvent};

/// Subject new blocks are announced on.
pub const BLOCKS_SUBJECT: &str = "claimchain.blocks";

/// Subject sign-request notifications are published on.
pub const NOTIFICATIONS_SUBJECT: &str = "claimchain.notifications";

const PING_INTERVAL: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Announcer publishing to a NATS server.
#[derive(Clone)]
pub struct NatsAnnouncer {
    client: async_nats::Client,
}

impl NatsAnnouncer {
    /// Connect to NATS.
    ///
    /// Fails fast when the server is unreachable; reconnection is handled
    /// by the client after the initial connection succeeds.
    pub async fn connect(url: &str, name: &str) -> Result<Self, BusError> {
        info!(url, "connecting to NATS");
        let client = ConnectOptions::new()
            .name(name)
            .ping_interval(PING_INTERVAL)
            .connection_timeout(CONNECT_TIMEOUT)
            .connect(url)
            .await
            .map_err(|e| BusError::Connect(format!("{}: {}", url, e)))?;
        info!(url, "connected to NATS");
        Ok(Self { client })
    }

    async fn publish_json<T: serde::Serialize>(
        &self,
        subject: &'static str,
        payload: &T,
    ) -> Result<(), BusError> {
        let bytes = serde_json::to_vec(payload).map_err(|e| BusError::Encode(e.to_string()))?;
        self.client
            .publish(subject, Bytes::from(bytes))
            .await
            .map_err(|e| BusError::Publish(format!("{}: {}", subject, e)))
    }
}

#[async_trait]
impl Announcer for NatsAnnouncer {
    async fn announce_block(&self, block: &Block) -> Result<(), BusError> {
        self.publish_json(BLOCKS_SUBJECT, &BlockAnnouncement::from_block(block))
            .await
    }

    async fn publish_notification(&self, event: &NotificationEvent) -> Result<(), BusError> {
        self.publish_json(NOTIFICATIONS_SUBJECT, event).await
    }
}
