//! Error types for claimchain-core.

use thiserror::Error;

/// Core errors that can occur during claim and block operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid secret key")]
    InvalidSecretKey,

    #[error("malformed claim: {0}")]
    MalformedClaim(String),

    #[error("malformed block: {0}")]
    MalformedBlock(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Validation errors for claim structure and signatures.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("signature verification failed")]
    SignatureFailed,

    #[error("claim id does not match content: expected {expected}, got {got}")]
    IdMismatch { expected: String, got: String },

    #[error("empty attribute key")]
    EmptyAttributeKey,

    #[error("attribute count {0} exceeds maximum of 64")]
    TooManyAttributes(usize),

    #[error("structural error: {0}")]
    StructuralError(String),
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidSignature
            | CoreError::InvalidPublicKey
            | CoreError::InvalidSecretKey => ValidationError::SignatureFailed,
            CoreError::MalformedClaim(msg)
            | CoreError::MalformedBlock(msg)
            | CoreError::DecodingError(msg) => ValidationError::StructuralError(msg),
        }
    }
}
