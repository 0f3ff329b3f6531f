//! Domain events emitted by accepted certifications.

use serde::{Deserialize, Serialize};

use claimchain_core::ClaimId;

/// An event describing what a certified claim changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    /// A new work, no `supersedes`.
    WorkCreated { work_id: ClaimId },

    /// An edit: the work supersedes a prior one.
    WorkModified {
        work_id: ClaimId,
        supersedes: ClaimId,
    },

    /// A title transfer recorded an owner for a work.
    TitleTransferred { work_id: ClaimId, owner: String },

    /// A paid license, seen from the holder's side.
    LicenseBought {
        claim_id: ClaimId,
        work_id: ClaimId,
        holder: String,
    },

    /// A paid license, seen from the owner's side.
    LicenseSold {
        claim_id: ClaimId,
        work_id: ClaimId,
        owner: String,
    },

    /// An owner licensed their own work.
    SelfLicense {
        claim_id: ClaimId,
        work_id: ClaimId,
        owner: String,
    },

    /// Profile display attributes changed.
    ProfileUpdated { public_key: String },

    /// A claim was revoked.
    ClaimRevoked {
        claim_id: ClaimId,
        reference: ClaimId,
    },
}
