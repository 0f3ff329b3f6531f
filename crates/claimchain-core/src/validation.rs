//! Structural claim validation.
//!
//! Validation checks, in order:
//! 1. Attribute keys are non-empty
//! 2. Attribute count does not exceed MAX_ATTRIBUTES
//! 3. The id matches the content encoding
//! 4. The signature verifies over the id bytes

use crate::claim::Claim;
use crate::crypto::{verify, ChainKind};
use crate::error::ValidationError;

/// Maximum number of attributes allowed on a claim.
pub const MAX_ATTRIBUTES: usize = 64;

/// Validate a claim's structure and signature.
pub fn validate_claim(claim: &Claim) -> Result<(), ValidationError> {
    // 1. Attribute keys are non-empty
    if claim.attributes.keys().any(|k| k.is_empty()) {
        return Err(ValidationError::EmptyAttributeKey);
    }

    // 2. Attribute count bound
    if claim.attributes.len() > MAX_ATTRIBUTES {
        return Err(ValidationError::TooManyAttributes(claim.attributes.len()));
    }

    // 3. Content-derived id matches
    let derived = claim.compute_id();
    if derived != claim.id {
        return Err(ValidationError::IdMismatch {
            expected: derived.to_hex(),
            got: claim.id.to_hex(),
        });
    }

    // 4. Signature over the id bytes
    if !verify(
        claim.id.as_bytes(),
        &claim.signature,
        &claim.public_key,
        ChainKind::Default,
    ) {
        return Err(ValidationError::SignatureFailed);
    }

    Ok(())
}
