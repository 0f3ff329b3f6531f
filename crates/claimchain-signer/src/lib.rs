//! # Claimchain Signer
//!
//! The remote signing coordinator: stateful request/response correlation
//! between clients that need a detached signature and the devices that
//! hold the keys.
//!
//! A request is created (over REST or WebSocket), keyed by a UUID v4,
//! and held in memory until the signing device submits a verifying
//! signature or the process restarts. See [`Coordinator`].

pub mod coordinator;
pub mod error;
pub mod request;
pub mod server;

pub use coordinator::Coordinator;
pub use error::SignerError;
pub use request::{PayloadSignature, Payloads, SignRequest};
pub use server::router;
