//! Error types for the signing coordinator.

use thiserror::Error;
use uuid::Uuid;

/// Hard errors raised by the coordinator.
///
/// A signature that fails to verify is not an error; `submit` reports it
/// as `Ok(false)`.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The request id is not pending. Either it never existed, it was
    /// already accepted, or the process restarted since it was created.
    #[error("no pending sign request with id {0}")]
    NotFound(Uuid),
}
