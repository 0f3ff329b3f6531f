//! Sign-request envelopes and signature submissions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use claimchain_core::{now_millis, ChainKind};

/// The payload(s) a sign request asks to be signed, hex-encoded.
///
/// Single requests carry one string on the wire, multi-requests an array;
/// the untagged representation preserves both shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payloads {
    Single(String),
    Many(Vec<String>),
}

impl Payloads {
    /// The payloads in order, one element for single requests.
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::Single(p) => std::slice::from_ref(p),
            Self::Many(ps) => ps,
        }
    }

    /// Number of payloads.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether there is nothing to sign.
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// A pending sign request, correlation key included.
///
/// Ephemeral: lives in the coordinator's pending map until its signer
/// responds or the process restarts. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequest {
    /// Opaque correlation key, UUID v4.
    pub id: Uuid,

    /// Whether this is a multi-payload request.
    pub multiple: bool,

    /// Whether signatures use the bitcoin double-SHA-256 convention.
    pub bitcoin: bool,

    /// Callback URL the signing device fetches the envelope from.
    pub url: String,

    /// The hex payload(s) to sign.
    pub message: Payloads,

    /// Creation time, unix milliseconds.
    pub timestamp: i64,
}

impl SignRequest {
    /// Build a fresh request with a random id.
    pub fn new(payloads: Vec<String>, multiple: bool, bitcoin: bool, callback_base: &str) -> Self {
        let id = Uuid::new_v4();
        let message = if multiple {
            Payloads::Many(payloads)
        } else {
            Payloads::Single(payloads.into_iter().next().unwrap_or_default())
        };
        Self {
            id,
            multiple,
            bitcoin,
            url: format!("{}/request/{}", callback_base.trim_end_matches('/'), id),
            message,
            timestamp: now_millis(),
        }
    }

    /// The digest convention signatures against this request must use.
    pub fn chain(&self) -> ChainKind {
        if self.bitcoin {
            ChainKind::Bitcoin
        } else {
            ChainKind::Default
        }
    }
}

/// One signature over one payload, as submitted by a signing device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSignature {
    /// Hex signature, compact or DER.
    pub signature: String,

    /// Hex compressed SEC1 public key.
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_request_serializes_message_as_string() {
        let request = SignRequest::new(vec!["deadbeef".into()], false, false, "http://auth:5000");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["message"], "deadbeef");
        assert_eq!(
            value["url"],
            format!("http://auth:5000/request/{}", request.id)
        );
    }

    #[test]
    fn test_multi_request_serializes_message_as_array() {
        let request = SignRequest::new(
            vec!["aa".into(), "bb".into()],
            true,
            true,
            "http://auth:5000/",
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["message"], serde_json::json!(["aa", "bb"]));
        assert_eq!(request.chain(), ChainKind::Bitcoin);
    }

    #[test]
    fn test_envelope_roundtrip() {
        let request = SignRequest::new(vec!["cafe".into()], false, false, "http://auth:5000");
        let json = serde_json::to_string(&request).unwrap();
        let back: SignRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
        assert_eq!(back.message.as_slice(), ["cafe"]);
    }
}
