//! HTTP and WebSocket surface of the signing coordinator.
//!
//! REST covers polling devices: create a request, fetch its envelope,
//! submit signatures. The WebSocket carries the push protocol: `create`
//! and `multiple` construct requests bound to the connection, `associate`
//! rebinds an existing request after a reconnect. Malformed WS messages
//! get an inline `{"error": ...}` reply, never a connection drop.

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::coordinator::Coordinator;
use crate::error::SignerError;
use crate::request::{PayloadSignature, SignRequest};

/// Errors surfaced over the REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),
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
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        };
        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<SignerError> for ApiError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::NotFound(id) => ApiError::NotFound(format!("sign request {}", id)),
        }
    }
}

/// Build the coordinator router.
pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/request", post(create_request))
        .route("/request/:id", get(get_request).post(submit_single))
        .route("/multiple/:id", post(submit_multiple))
        .route("/ws", get(ws_upgrade))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(coordinator)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_request(
    State(coordinator): State<Arc<Coordinator>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<SignRequest>, ApiError> {
    let payload = body.trim().to_string();
    if payload.is_empty() || hex::decode(&payload).is_err() {
        return Err(ApiError::BadRequest("body must be a hex payload".into()));
    }
    let notify = headers
        .get("x-notify-pubkey")
        .and_then(|v| v.to_str().ok());
    let request = coordinator
        .create_request(vec![payload], false, false, notify)
        .await;
    Ok(Json(request))
}

async fn get_request(
    State(coordinator): State<Arc<Coordinator>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SignRequest>, ApiError> {
    coordinator
        .get_request(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("sign request {}", id)))
}

async fn submit_single(
    State(coordinator): State<Arc<Coordinator>>,
    Path(id): Path<Uuid>,
    Json(signature): Json<PayloadSignature>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let accepted = coordinator.submit(id, std::slice::from_ref(&signature))?;
    Ok(Json(json!({ "success": accepted })))
}

async fn submit_multiple(
    State(coordinator): State<Arc<Coordinator>>,
    Path(id): Path<Uuid>,
    Json(signatures): Json<Vec<PayloadSignature>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let accepted = coordinator.submit(id, &signatures)?;
    Ok(Json(json!({ "success": accepted })))
}

async fn ws_upgrade(
    State(coordinator): State<Arc<Coordinator>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| handle_connection(coordinator, socket))
}

/// Inbound WebSocket protocol.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WsRequest {
    Create {
        payload: String,
        #[serde(default)]
        bitcoin: bool,
        #[serde(default, rename = "ref")]
        reference: Option<String>,
        #[serde(default, rename = "notifyPubkey")]
        notify_pubkey: Option<String>,
    },
    Multiple {
        payload: Vec<String>,
        #[serde(default)]
        bitcoin: bool,
        #[serde(default, rename = "ref")]
        reference: Option<String>,
        #[serde(default, rename = "notifyPubkey")]
        notify_pubkey: Option<String>,
    },
    Associate {
        id: Uuid,
    },
}

async fn handle_connection(coordinator: Arc<Coordinator>, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    // Everything outbound funnels through one channel so the coordinator
    // can push accepted results without owning the sink.
    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let reply = handle_ws_message(&coordinator, &tx, &text).await;
        if let Some(reply) = reply {
            if tx.send(reply).is_err() {
                break;
            }
        }
    }

    coordinator.disconnect(&tx);
    drop(tx);
    let _ = writer.await;
    debug!("signing connection closed");
}

async fn handle_ws_message(
    coordinator: &Coordinator,
    connection: &mpsc::UnboundedSender<String>,
    text: &str,
) -> Option<String> {
    let request: WsRequest = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(err) => {
            warn!(error = %err, "unparseable signing message");
            return Some(json!({ "error": format!("bad message: {}", err) }).to_string());
        }
    };

    match request {
        WsRequest::Create {
            payload,
            bitcoin,
            reference,
            notify_pubkey,
        } => {
            if payload.is_empty() {
                return Some(json!({ "error": "need a payload" }).to_string());
            }
            Some(
                created_reply(
                    coordinator,
                    connection,
                    vec![payload],
                    false,
                    bitcoin,
                    reference,
                    notify_pubkey,
                )
                .await,
            )
        }
        WsRequest::Multiple {
            payload,
            bitcoin,
            reference,
            notify_pubkey,
        } => {
            if payload.is_empty() {
                return Some(json!({ "error": "need a payload" }).to_string());
            }
            Some(
                created_reply(
                    coordinator,
                    connection,
                    payload,
                    true,
                    bitcoin,
                    reference,
                    notify_pubkey,
                )
                .await,
            )
        }
        WsRequest::Associate { id } => match coordinator.associate(id, connection.clone()) {
            Ok(()) => None,
            Err(err) => Some(json!({ "error": err.to_string() }).to_string()),
        },
    }
}

async fn created_reply(
    coordinator: &Coordinator,
    connection: &mpsc::UnboundedSender<String>,
    payloads: Vec<String>,
    multiple: bool,
    bitcoin: bool,
    reference: Option<String>,
    notify_pubkey: Option<String>,
) -> String {
    let request = coordinator
        .create_request(payloads, multiple, bitcoin, notify_pubkey.as_deref())
        .await;
    // The request was just created, so binding cannot fail.
    let _ = coordinator.associate(request.id, connection.clone());
    json!({
        "status": "created",
        "encoded": request,
        "ref": reference.unwrap_or_default(),
    })
    .to_string()
}
