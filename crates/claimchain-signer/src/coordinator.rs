//! Request/response correlation for remote signing.
//!
//! A client that cannot sign locally creates a sign request here, a
//! signing device fetches the envelope (or is pushed it over a live
//! WebSocket), signs, and submits. Acceptance removes the request from
//! the pending map, so a second submit against the same id comes back
//! `NotFound` and double-counting is structurally impossible.
//!
//! Nothing here is persistent: a process restart loses in-flight
//! requests, which is a documented limitation of the protocol.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use uuid::Uuid;

use claimchain_bus::{Announcer, NotificationEvent};
use claimchain_core::verify_hex;

use crate::error::SignerError;
use crate::request::{PayloadSignature, SignRequest};

/// The signing coordinator: pending requests and their live connections.
pub struct Coordinator {
    requests: DashMap<Uuid, SignRequest>,
    connections: DashMap<Uuid, UnboundedSender<String>>,
    bus: Option<Arc<dyn Announcer>>,
    callback_base: String,
}

impl Coordinator {
    /// Create a coordinator. `callback_base` is the externally reachable
    /// URL prefix signing devices fetch request envelopes from.
    pub fn new(callback_base: impl Into<String>, bus: Option<Arc<dyn Announcer>>) -> Self {
        Self {
            requests: DashMap::new(),
            connections: DashMap::new(),
            bus,
            callback_base: callback_base.into(),
        }
    }

    /// Create a sign request and store it in the pending map.
    ///
    /// When `notify_pubkey` names a registered signing device, a "please
    /// sign" notification goes out on the bus. Best-effort: a publish
    /// failure is logged and the request is created anyway.
    pub async fn create_request(
        &self,
        payloads: Vec<String>,
        multiple: bool,
        bitcoin: bool,
        notify_pubkey: Option<&str>,
    ) -> SignRequest {
        let request = SignRequest::new(payloads, multiple, bitcoin, &self.callback_base);
        self.requests.insert(request.id, request.clone());
        debug!(request = %request.id, multiple, bitcoin, "sign request created");

        if let (Some(bus), Some(pub_key)) = (&self.bus, notify_pubkey) {
            let event = NotificationEvent {
                pub_key: pub_key.to_string(),
                request_id: request.id.to_string(),
            };
            if let Err(err) = bus.publish_notification(&event).await {
                warn!(request = %request.id, error = %err, "sign notification failed");
            }
        }

        request
    }

    /// Fetch a pending request envelope.
    pub fn get_request(&self, id: &Uuid) -> Option<SignRequest> {
        self.requests.get(id).map(|r| r.clone())
    }

    /// Bind a live connection to a pending request id, so acceptance can
    /// be pushed instead of polled. Rebinding replaces the previous
    /// connection, which is how a reconnecting device reclaims context.
    pub fn associate(
        &self,
        id: Uuid,
        connection: UnboundedSender<String>,
    ) -> Result<(), SignerError> {
        if !self.requests.contains_key(&id) {
            return Err(SignerError::NotFound(id));
        }
        self.connections.insert(id, connection);
        Ok(())
    }

    /// Drop every association bound to this connection.
    pub fn disconnect(&self, connection: &UnboundedSender<String>) {
        self.connections
            .retain(|_, bound| !bound.same_channel(connection));
    }

    /// Submit signatures for a pending request.
    ///
    /// All-or-nothing: the submission is accepted only if every payload
    /// has a signature that verifies under the request's chain kind.
    /// `Ok(false)` leaves the request pending so the device can retry;
    /// `Ok(true)` removes it and pushes the signed result to the
    /// associated connection, if one is live.
    pub fn submit(
        &self,
        id: Uuid,
        signatures: &[PayloadSignature],
    ) -> Result<bool, SignerError> {
        let request = self
            .get_request(&id)
            .ok_or(SignerError::NotFound(id))?;

        let payloads = request.message.as_slice();
        if signatures.len() != payloads.len() {
            warn!(
                request = %id,
                expected = payloads.len(),
                got = signatures.len(),
                "signature count mismatch"
            );
            return Ok(false);
        }
        let all_valid = payloads.iter().zip(signatures).all(|(payload, sig)| {
            verify_hex(payload, &sig.signature, &sig.public_key, request.chain())
        });
        if !all_valid {
            debug!(request = %id, "signature submission rejected");
            return Ok(false);
        }

        // Removal is the acceptance point: of two racing submits that
        // both verified, only the one that observes the removal may
        // report acceptance.
        if self.requests.remove(&id).is_none() {
            return Err(SignerError::NotFound(id));
        }
        debug!(request = %id, "signature submission accepted");

        if let Some((_, connection)) = self.connections.remove(&id) {
            let result = if request.multiple {
                json!({ "id": id, "request": request, "signatures": signatures })
            } else {
                json!({ "id": id, "request": request, "signature": signatures[0] })
            };
            // The push is best-effort; the device may have disconnected
            // between associating and signing.
            if connection.send(result.to_string()).is_err() {
                debug!(request = %id, "signed result had no live connection");
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimchain_bus::RecordingAnnouncer;
    use claimchain_core::{ChainKind, Keypair};
    use tokio::sync::mpsc;

    fn sign_payload(keypair: &Keypair, payload_hex: &str, chain: ChainKind) -> PayloadSignature {
        let message = hex::decode(payload_hex).unwrap();
        PayloadSignature {
            signature: keypair.sign(&message, chain).to_hex(),
            public_key: keypair.public_key().to_hex(),
        }
    }

    #[tokio::test]
    async fn test_single_request_lifecycle() {
        let coordinator = Coordinator::new("http://auth:5000", None);
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();

        let request = coordinator
            .create_request(vec!["deadbeef".into()], false, false, None)
            .await;
        assert_eq!(coordinator.get_request(&request.id), Some(request.clone()));

        let sig = sign_payload(&keypair, "deadbeef", ChainKind::Default);
        assert!(coordinator.submit(request.id, &[sig]).unwrap());

        // Accepted requests are gone; resubmission is NotFound, not a
        // second acceptance.
        assert_eq!(coordinator.get_request(&request.id), None);
        let sig = sign_payload(&keypair, "deadbeef", ChainKind::Default);
        assert!(matches!(
            coordinator.submit(request.id, &[sig]),
            Err(SignerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_submits_accept_exactly_once() {
        let coordinator = Arc::new(Coordinator::new("http://auth:5000", None));
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();

        let request = coordinator
            .create_request(vec!["deadbeef".into()], false, false, None)
            .await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coordinator = coordinator.clone();
            let id = request.id;
            let sig = sign_payload(&keypair, "deadbeef", ChainKind::Default);
            handles.push(tokio::spawn(async move {
                coordinator.submit(id, &[sig])
            }));
        }

        let mut accepted = 0;
        let mut not_found = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(true) => accepted += 1,
                Err(SignerError::NotFound(_)) => not_found += 1,
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(not_found, 7);
    }

    #[tokio::test]
    async fn test_bad_signature_leaves_request_pending() {
        let coordinator = Coordinator::new("http://auth:5000", None);
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();

        let request = coordinator
            .create_request(vec!["deadbeef".into()], false, false, None)
            .await;

        // Signed the wrong payload
        let sig = sign_payload(&keypair, "cafebabe", ChainKind::Default);
        assert!(!coordinator.submit(request.id, &[sig]).unwrap());
        assert!(coordinator.get_request(&request.id).is_some());

        let sig = sign_payload(&keypair, "deadbeef", ChainKind::Default);
        assert!(coordinator.submit(request.id, &[sig]).unwrap());
    }

    #[tokio::test]
    async fn test_multi_request_is_all_or_nothing() {
        let coordinator = Coordinator::new("http://auth:5000", None);
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();

        let request = coordinator
            .create_request(vec!["aa11".into(), "bb22".into()], true, true, None)
            .await;

        let good = sign_payload(&keypair, "aa11", ChainKind::Bitcoin);
        let bad = sign_payload(&keypair, "ffff", ChainKind::Bitcoin);
        assert!(!coordinator
            .submit(request.id, &[good.clone(), bad])
            .unwrap());

        // Count mismatch is also a rejection
        assert!(!coordinator.submit(request.id, &[good]).unwrap());

        let sigs = [
            sign_payload(&keypair, "aa11", ChainKind::Bitcoin),
            sign_payload(&keypair, "bb22", ChainKind::Bitcoin),
        ];
        assert!(coordinator.submit(request.id, &sigs).unwrap());
    }

    #[tokio::test]
    async fn test_bitcoin_request_rejects_single_sha_signature() {
        let coordinator = Coordinator::new("http://auth:5000", None);
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();

        let request = coordinator
            .create_request(vec!["deadbeef".into()], false, true, None)
            .await;
        let sig = sign_payload(&keypair, "deadbeef", ChainKind::Default);
        assert!(!coordinator.submit(request.id, &[sig]).unwrap());
    }

    #[tokio::test]
    async fn test_acceptance_pushes_to_associated_connection() {
        let coordinator = Coordinator::new("http://auth:5000", None);
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let request = coordinator
            .create_request(vec!["deadbeef".into()], false, false, None)
            .await;
        coordinator.associate(request.id, tx).unwrap();

        let sig = sign_payload(&keypair, "deadbeef", ChainKind::Default);
        assert!(coordinator.submit(request.id, &[sig.clone()]).unwrap());

        let pushed: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(pushed["id"], request.id.to_string());
        assert_eq!(pushed["signature"]["signature"], sig.signature);
        assert_eq!(pushed["request"]["message"], "deadbeef");
    }

    #[tokio::test]
    async fn test_associate_unknown_id_fails() {
        let coordinator = Coordinator::new("http://auth:5000", None);
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(
            coordinator.associate(Uuid::new_v4(), tx),
            Err(SignerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_notification_published_when_target_named() {
        let bus = Arc::new(RecordingAnnouncer::new());
        let coordinator = Coordinator::new("http://auth:5000", Some(bus.clone()));

        let request = coordinator
            .create_request(vec!["deadbeef".into()], false, false, Some("02abc"))
            .await;

        let notifications = bus.notifications().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].pub_key, "02abc");
        assert_eq!(notifications[0].request_id, request.id.to_string());
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_block_creation() {
        let bus = Arc::new(RecordingAnnouncer::new());
        bus.fail_publishes();
        let coordinator = Coordinator::new("http://auth:5000", Some(bus));

        let request = coordinator
            .create_request(vec!["deadbeef".into()], false, false, Some("02abc"))
            .await;
        assert!(coordinator.get_request(&request.id).is_some());
    }

    #[tokio::test]
    async fn test_disconnect_drops_associations() {
        let coordinator = Coordinator::new("http://auth:5000", None);
        let (tx, _rx) = mpsc::unbounded_channel();

        let request = coordinator
            .create_request(vec!["deadbeef".into()], false, false, None)
            .await;
        coordinator.associate(request.id, tx.clone()).unwrap();
        coordinator.disconnect(&tx);
        assert!(coordinator.connections.is_empty());
    }
}
