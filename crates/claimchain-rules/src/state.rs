//! Accumulated domain state the certification hooks validate against.
//!
//! Works, offerings, licenses, and profiles are kept in concurrent maps
//! owned by the engine instance. This is process-local read state for
//! rule evaluation; durable queryable state lives with the downstream
//! consumers that ingest block announcements.

use std::collections::BTreeMap;

use dashmap::DashMap;

use claimchain_core::ClaimId;

/// A creative work, forming an edit chain via `supersedes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Work {
    pub id: ClaimId,

    /// Author public key, when the claim named a well-formed one.
    pub author: Option<String>,

    pub name: String,

    /// The prior work this one edits.
    pub supersedes: Option<ClaimId>,

    /// Owner of record, set by TITLE claims.
    pub owner: Option<String>,

    /// License holders allowed to republish, appended by LICENSE claims.
    pub publishers: Vec<String>,
}

/// An offer to license a work for a price.
#[derive(Debug, Clone, PartialEq)]
pub struct Offering {
    pub id: ClaimId,
    pub work: ClaimId,
    pub payment_address: String,
    pub payment_amount: f64,
}

/// A granted license over a work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct License {
    pub id: ClaimId,
    pub work: ClaimId,
    pub holder: String,
    pub emitter: String,
    pub proof_type: String,

    /// The paying transaction, for bitcoin-transaction proofs.
    pub bitcoin_tx: Option<String>,
}

/// Display attributes bound to a public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub public_key: String,
    pub attributes: BTreeMap<String, String>,
}

/// Concurrent domain state, keyed by claim id (works, offerings,
/// licenses) or public key (profiles).
#[derive(Debug, Default)]
pub struct DomainState {
    works: DashMap<ClaimId, Work>,
    offerings: DashMap<ClaimId, Offering>,
    licenses: DashMap<ClaimId, License>,
    profiles: DashMap<String, Profile>,
    revocations: DashMap<ClaimId, ClaimId>,
}

impl DomainState {
    /// Create empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a work.
    pub fn upsert_work(&self, work: Work) {
        self.works.insert(work.id, work);
    }

    /// Look up a work.
    pub fn work(&self, id: &ClaimId) -> Option<Work> {
        self.works.get(id).map(|w| w.clone())
    }

    /// The owner of record for a work, as recorded by TITLE claims.
    pub fn owner_of(&self, work_id: &ClaimId) -> Option<String> {
        self.works.get(work_id).and_then(|w| w.owner.clone())
    }

    /// Record a title transfer.
    ///
    /// Returns false when the work is unknown.
    pub fn set_owner(&self, work_id: &ClaimId, owner: &str) -> bool {
        match self.works.get_mut(work_id) {
            Some(mut work) => {
                work.owner = Some(owner.to_string());
                true
            }
            None => false,
        }
    }

    /// Append a license holder to a work's publisher list.
    pub fn append_publisher(&self, work_id: &ClaimId, holder: &str) {
        if let Some(mut work) = self.works.get_mut(work_id) {
            work.publishers.push(holder.to_string());
        }
    }

    /// Insert an offering.
    pub fn add_offering(&self, offering: Offering) {
        self.offerings.insert(offering.id, offering);
    }

    /// Look up an offering.
    pub fn offering(&self, id: &ClaimId) -> Option<Offering> {
        self.offerings.get(id).map(|o| o.clone())
    }

    /// Insert a license.
    pub fn add_license(&self, license: License) {
        self.licenses.insert(license.id, license);
    }

    /// Look up a license.
    pub fn license(&self, id: &ClaimId) -> Option<License> {
        self.licenses.get(id).map(|l| l.clone())
    }

    /// Fetch a profile, creating an empty one if the key is new.
    pub fn get_or_create_profile(&self, public_key: &str) -> Profile {
        self.profiles
            .entry(public_key.to_string())
            .or_insert_with(|| Profile {
                public_key: public_key.to_string(),
                attributes: BTreeMap::new(),
            })
            .clone()
    }

    /// Merge display attributes into a profile.
    pub fn update_profile(&self, public_key: &str, attributes: &BTreeMap<String, String>) {
        let mut entry = self
            .profiles
            .entry(public_key.to_string())
            .or_insert_with(|| Profile {
                public_key: public_key.to_string(),
                attributes: BTreeMap::new(),
            });
        entry
            .attributes
            .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Look up a profile without creating it.
    pub fn profile(&self, public_key: &str) -> Option<Profile> {
        self.profiles.get(public_key).map(|p| p.clone())
    }

    /// Record a revocation of a claim.
    pub fn add_revocation(&self, revocation_id: ClaimId, revoked: ClaimId) {
        self.revocations.insert(revocation_id, revoked);
    }

    /// Whether a claim has been revoked.
    pub fn is_revoked(&self, claim_id: &ClaimId) -> bool {
        self.revocations.iter().any(|r| *r.value() == *claim_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work(id: u8) -> Work {
        Work {
            id: ClaimId::from_bytes([id; 32]),
            author: None,
            name: format!("work {}", id),
            supersedes: None,
            owner: None,
            publishers: Vec::new(),
        }
    }

    #[test]
    fn test_owner_lifecycle() {
        let state = DomainState::new();
        let w = work(1);
        let id = w.id;
        state.upsert_work(w);

        assert_eq!(state.owner_of(&id), None);
        assert!(state.set_owner(&id, "02aa"));
        assert_eq!(state.owner_of(&id), Some("02aa".to_string()));

        // Unknown works cannot take owners
        assert!(!state.set_owner(&ClaimId::from_bytes([9; 32]), "02aa"));
    }

    #[test]
    fn test_publisher_append() {
        let state = DomainState::new();
        let w = work(1);
        let id = w.id;
        state.upsert_work(w);

        state.append_publisher(&id, "02bb");
        state.append_publisher(&id, "02cc");
        assert_eq!(state.work(&id).unwrap().publishers, vec!["02bb", "02cc"]);
    }

    #[test]
    fn test_profile_get_or_create_is_idempotent() {
        let state = DomainState::new();
        let a = state.get_or_create_profile("02aa");
        let b = state.get_or_create_profile("02aa");
        assert_eq!(a, b);
        assert!(state.profile("02aa").is_some());
        assert!(state.profile("02bb").is_none());
    }
}
