//! HTTP surface of the publisher.
//!
//! Four ways in, one pipeline: decode or synthesize claims, verify
//! signatures, certify, publish the survivors as one anchored block.
//! `POST /claims` and `POST /v2/claims` accept client-signed claim
//! bytes; `POST /titles` and `POST /licenses` synthesize the claim
//! server-side from payment fields and sign it with the publisher key.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use claimchain_core::{
    decode_claim, fields, validate_claim, Claim, ClaimBuilder, ClaimKind, SignatureBytes,
    ValidationError,
};
use claimchain_rules::{CertificationEngine, CertificationOutcome, RulesError};

use crate::assembler::Publisher;
use crate::error::PublishError;

/// Shared handler state.
pub struct AppState {
    pub publisher: Publisher,
    pub engine: CertificationEngine,
}

/// Errors surfaced over the REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("invalid signature on claim {0}")]
    InvalidSignature(String),

    #[error("anchoring failed: {0}")]
    Anchoring(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Error body: every failure yields complete JSON.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::InvalidSignature(_) => (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE"),
            ApiError::Anchoring(_) => (StatusCode::BAD_GATEWAY, "ANCHORING_FAILED"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };
        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<RulesError> for ApiError {
    fn from(err: RulesError) -> Self {
        match err {
            RulesError::OfferingWithoutWork => ApiError::BadRequest(err.to_string()),
            RulesError::Oracle(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<PublishError> for ApiError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Anchoring(e) => ApiError::Anchoring(e.to_string()),
            PublishError::EmptyBlock => ApiError::Internal(err.to_string()),
        }
    }
}

/// Build the publisher router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/titles", post(post_titles))
        .route("/licenses", post(post_licenses))
        .route("/claims", post(post_claims))
        .route("/v2/claims", post(post_claims_v2))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// A client-signed claim: hex canonical claim bytes plus a detached
/// signature.
#[derive(Debug, Deserialize)]
struct SignedMessage {
    message: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct ClaimsBody {
    signatures: Vec<SignedMessage>,
}

#[derive(Debug, Deserialize)]
struct SignedClaimBytes {
    claim: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct ClaimsV2Body {
    claims: Vec<SignedClaimBytes>,
}

/// Payment fields a title transfer or license purchase is synthesized
/// from.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransferBody {
    reference: String,
    reference_offering: String,
    tx_id: String,
    ntx_id: String,
    output_index: u32,
    reference_owner: String,
    owner: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedClaims {
    created_claims: Vec<Claim>,
}

async fn post_claims(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClaimsBody>,
) -> Result<Json<CreatedClaims>, ApiError> {
    let claims = body
        .signatures
        .into_iter()
        .map(|s| decode_signed_claim(&s.message, &s.signature))
        .collect::<Result<Vec<_>, _>>()?;
    run_pipeline(&state, claims).await
}

async fn post_claims_v2(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClaimsV2Body>,
) -> Result<Json<CreatedClaims>, ApiError> {
    let claims = body
        .claims
        .into_iter()
        .map(|s| decode_signed_claim(&s.claim, &s.signature))
        .collect::<Result<Vec<_>, _>>()?;
    run_pipeline(&state, claims).await
}

async fn post_titles(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TransferBody>,
) -> Result<Json<CreatedClaims>, ApiError> {
    let claim = transfer_claim(&state.publisher, ClaimKind::Title, &body);
    run_pipeline(&state, vec![claim]).await
}

async fn post_licenses(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TransferBody>,
) -> Result<Json<CreatedClaims>, ApiError> {
    let claim = transfer_claim(&state.publisher, ClaimKind::License, &body);
    run_pipeline(&state, vec![claim]).await
}

/// Decode hex claim bytes, attach the detached signature, re-derive the
/// id, and validate structure and signature. A claim that fails here
/// fails the whole request.
fn decode_signed_claim(claim_hex: &str, signature_hex: &str) -> Result<Claim, ApiError> {
    let bytes = hex::decode(claim_hex)
        .map_err(|e| ApiError::BadRequest(format!("claim is not hex: {}", e)))?;
    let decoded = decode_claim(&bytes)
        .map_err(|e| ApiError::BadRequest(format!("malformed claim: {}", e)))?;
    let signature = SignatureBytes::from_wire_hex(signature_hex)
        .ok_or_else(|| ApiError::BadRequest("malformed signature".into()))?;
    let claim = decoded.with_signature(signature);
    match validate_claim(&claim) {
        Ok(()) => Ok(claim),
        Err(ValidationError::SignatureFailed) => Err(ApiError::InvalidSignature(claim.id.to_hex())),
        Err(err) => Err(ApiError::BadRequest(format!("invalid claim: {}", err))),
    }
}

/// Synthesize a publisher-signed TITLE or LICENSE claim from payment
/// fields. `owner` lands in `owner` for titles and `licenseHolder` for
/// licenses.
fn transfer_claim(publisher: &Publisher, kind: ClaimKind, body: &TransferBody) -> Claim {
    let owner_field = match kind {
        ClaimKind::Title => fields::OWNER,
        _ => fields::LICENSE_HOLDER,
    };
    ClaimBuilder::new(kind)
        .attribute(fields::REFERENCE, &body.reference)
        .attribute(fields::REFERENCE_OFFERING, &body.reference_offering)
        .attribute(fields::PROOF_TYPE, fields::PROOF_TYPE_BITCOIN)
        .attribute(
            fields::PROOF_VALUE,
            json!({
                "txId": body.tx_id,
                "ntxId": body.ntx_id,
                "outputIndex": body.output_index,
            })
            .to_string(),
        )
        .attribute(fields::REFERENCE_OWNER, &body.reference_owner)
        .attribute(owner_field, &body.owner)
        .sign(publisher.keypair())
}

/// Certify and publish one claim batch.
///
/// Every WORK claim gets a publisher-signed TITLE synthesized for it,
/// recording the submitter as the work's first owner of record. Claims
/// the engine rejects are dropped; the survivors are published as one
/// anchored block.
async fn run_pipeline(
    state: &AppState,
    submitted: Vec<Claim>,
) -> Result<Json<CreatedClaims>, ApiError> {
    let titles: Vec<Claim> = submitted
        .iter()
        .filter(|c| c.kind == ClaimKind::Work)
        .map(|work| {
            ClaimBuilder::new(ClaimKind::Title)
                .attribute(fields::REFERENCE, work.id.to_hex())
                .attribute(fields::OWNER, work.public_key.to_hex())
                .sign(state.publisher.keypair())
        })
        .collect();

    let mut batch = submitted;
    batch.extend(titles);

    let outcomes = state.engine.certify_batch(&batch).await?;
    let survivors: Vec<Claim> = batch
        .into_iter()
        .zip(&outcomes)
        .filter_map(|(claim, outcome)| match outcome {
            CertificationOutcome::Accepted { .. } => Some(claim),
            CertificationOutcome::Rejected { reason } => {
                warn!(claim = %claim.id, reason = %reason, "claim dropped from block");
                None
            }
        })
        .collect();

    if survivors.is_empty() {
        info!("no claims survived certification, nothing anchored");
        return Ok(Json(CreatedClaims {
            created_claims: vec![],
        }));
    }

    let created = state.publisher.publish(survivors).await?;
    Ok(Json(CreatedClaims {
        created_claims: created,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimchain_core::Keypair;

    #[test]
    fn test_decode_signed_claim_roundtrip() {
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let claim = ClaimBuilder::new(ClaimKind::Work)
            .attribute("name", "Ulalume")
            .sign(&keypair);

        let decoded = decode_signed_claim(
            &hex::encode(claim.canonical_bytes()),
            &claim.signature.to_hex(),
        )
        .unwrap();
        assert_eq!(decoded, claim);
    }

    #[test]
    fn test_decode_rejects_wrong_signature() {
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let other = Keypair::from_seed(&[0x07; 32]).unwrap();
        let claim = ClaimBuilder::new(ClaimKind::Work)
            .attribute("name", "Ulalume")
            .sign(&keypair);
        let forged = ClaimBuilder::new(ClaimKind::Work)
            .attribute("name", "Ulalume")
            .sign(&other);

        let err = decode_signed_claim(
            &hex::encode(claim.canonical_bytes()),
            &forged.signature.to_hex(),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidSignature(_)));
    }

    #[test]
    fn test_decode_rejects_empty_attribute_key() {
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let claim = ClaimBuilder::new(ClaimKind::Work)
            .attribute("", "Ulalume")
            .sign(&keypair);

        let err = decode_signed_claim(
            &hex::encode(claim.canonical_bytes()),
            &claim.signature.to_hex(),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_decode_rejects_non_hex() {
        assert!(matches!(
            decode_signed_claim("zz", "00"),
            Err(ApiError::BadRequest(_))
        ));
    }
}
