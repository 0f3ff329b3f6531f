//! Error types for the announcement channel.

use thiserror::Error;

/// Errors raised by announcer implementations.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus connection failed: {0}")]
    Connect(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("encoding error: {0}")]
    Encode(String),
}
