//! Well-known attribute keys.
//!
//! Claim attributes are an open string map at the wire boundary; these
//! constants name the keys the certification rules understand.

/// Author public key of a work (hex compressed SEC1).
pub const AUTHOR: &str = "author";

/// Display name of a work.
pub const WORK_NAME: &str = "name";

/// Claim id of the work this claim supersedes (edit chains).
pub const SUPERSEDES: &str = "supersedes";

/// Claim id of the referenced work.
pub const REFERENCE: &str = "reference";

/// Claim id of the offering backing a payment proof.
pub const REFERENCE_OFFERING: &str = "referenceOffering";

/// Public key the claim states as the work's owner.
pub const REFERENCE_OWNER: &str = "referenceOwner";

/// Public key of the new owner (title transfers).
pub const OWNER: &str = "owner";

/// Public key of the license holder.
pub const LICENSE_HOLDER: &str = "licenseHolder";

/// Kind of payment evidence attached to a license or title.
pub const PROOF_TYPE: &str = "proofType";

/// The evidence itself, JSON-encoded.
pub const PROOF_VALUE: &str = "proofValue";

/// Bitcoin address an offering asks payment to.
pub const PAYMENT_ADDRESS: &str = "paymentAddress";

/// Price of an offering, in coins.
pub const PAYMENT_AMOUNT: &str = "paymentAmount";

/// Unix-millisecond timestamp a certificate claim carries.
pub const CERTIFICATION_TIME: &str = "certificationTime";

/// Proof type for licenses paid with an on-chain transaction.
pub const PROOF_TYPE_BITCOIN: &str = "Bitcoin Transaction";

/// Proof type for licenses the owner grants themselves.
pub const PROOF_TYPE_SELF_OWNED: &str = "License Owner";
