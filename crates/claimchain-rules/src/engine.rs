//! The certification engine.
//!
//! One hook per claim kind, dispatched through an exhaustive match so a
//! new kind cannot be added without deciding its rule. Hooks are functions
//! of (state, claim, oracle): given the same state and claim they produce
//! the same outcome, so every rule is testable claim-by-claim with a
//! fixture oracle.

use std::sync::Arc;

use tracing::{debug, warn};

use claimchain_core::{fields, looks_like_public_key, Claim, ClaimId, ClaimKind};
use claimchain_oracle::{ChainOracle, TransactionInfo};

use crate::attributes::{
    LicenseAttributes, OfferingAttributes, ProofValue, TitleAttributes, WorkAttributes,
};
use crate::error::RulesError;
use crate::events::DomainEvent;
use crate::state::{DomainState, License, Offering, Work};

/// Absolute tolerance for payment-amount comparison. Floating-point
/// payment values are never compared for exact equality.
pub const PAYMENT_TOLERANCE: f64 = 1e-8;

/// The outcome of certifying one claim.
///
/// Expected invalid input is `Rejected`, never an error; hard errors are
/// reserved for protocol violations and oracle failures ([`RulesError`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificationOutcome {
    /// The claim is authoritative; state was updated and these events
    /// describe the change.
    Accepted { events: Vec<DomainEvent> },

    /// The claim failed a rule. No persistence, no events.
    Rejected { reason: String },
}

impl CertificationOutcome {
    fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Whether the claim was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The emitted events, empty for rejections.
    pub fn events(&self) -> &[DomainEvent] {
        match self {
            Self::Accepted { events } => events,
            Self::Rejected { .. } => &[],
        }
    }
}

/// Per-claim-kind certification over accumulated domain state.
pub struct CertificationEngine {
    state: DomainState,
    oracle: Arc<dyn ChainOracle>,
}

impl CertificationEngine {
    /// Create an engine with empty state.
    pub fn new(oracle: Arc<dyn ChainOracle>) -> Self {
        Self {
            state: DomainState::new(),
            oracle,
        }
    }

    /// The accumulated domain state.
    pub fn state(&self) -> &DomainState {
        &self.state
    }

    /// Certify a batch of signature-checked claims, in submission order.
    ///
    /// An OFFERING claim without a reference borrows the id of the batch's
    /// first WORK claim; a batch containing such an OFFERING but no WORK
    /// at all is a hard error, not a rejection.
    pub async fn certify_batch(
        &self,
        claims: &[Claim],
    ) -> Result<Vec<CertificationOutcome>, RulesError> {
        let batch_work = claims
            .iter()
            .find(|c| c.kind == ClaimKind::Work)
            .map(|c| c.id);

        let mut outcomes = Vec::with_capacity(claims.len());
        for claim in claims {
            let outcome = self.certify(claim, batch_work).await?;
            if let CertificationOutcome::Rejected { reason } = &outcome {
                warn!(claim = %claim.id, kind = %claim.kind, reason = %reason, "claim rejected");
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Certify a single claim.
    ///
    /// `batch_work` is the WORK claim id an unreferenced OFFERING in the
    /// same batch may borrow.
    pub async fn certify(
        &self,
        claim: &Claim,
        batch_work: Option<ClaimId>,
    ) -> Result<CertificationOutcome, RulesError> {
        debug!(claim = %claim.id, kind = %claim.kind, "certifying claim");
        match claim.kind {
            ClaimKind::Work => Ok(self.certify_work(claim)),
            ClaimKind::Title => Ok(self.certify_title(claim)),
            ClaimKind::License => self.certify_license(claim).await,
            ClaimKind::Offering => self.certify_offering(claim, batch_work),
            ClaimKind::Profile => Ok(self.certify_profile(claim)),
            ClaimKind::Certificate => Ok(CertificationOutcome::Accepted { events: vec![] }),
            ClaimKind::Revocation => Ok(self.certify_revocation(claim)),
        }
    }

    fn certify_work(&self, claim: &Claim) -> CertificationOutcome {
        let attrs = match WorkAttributes::parse(claim) {
            Ok(a) => a,
            Err(reason) => return CertificationOutcome::rejected(reason),
        };

        // An author profile is only created for a well-formed compressed
        // key; anything else leaves the work authorless.
        let author = attrs.author.filter(|a| looks_like_public_key(a));
        if let Some(author) = &author {
            self.state.get_or_create_profile(author);
        }

        let event = match attrs.supersedes {
            Some(supersedes) => DomainEvent::WorkModified {
                work_id: claim.id,
                supersedes,
            },
            None => DomainEvent::WorkCreated { work_id: claim.id },
        };

        self.state.upsert_work(Work {
            id: claim.id,
            author,
            name: attrs.name,
            supersedes: attrs.supersedes,
            owner: None,
            publishers: Vec::new(),
        });

        CertificationOutcome::Accepted {
            events: vec![event],
        }
    }

    fn certify_title(&self, claim: &Claim) -> CertificationOutcome {
        let attrs = match TitleAttributes::parse(claim) {
            Ok(a) => a,
            Err(reason) => return CertificationOutcome::rejected(reason),
        };

        if !self.state.set_owner(&attrs.reference, &attrs.owner) {
            return CertificationOutcome::rejected(format!(
                "title references unknown work {}",
                attrs.reference
            ));
        }
        self.state.get_or_create_profile(&attrs.owner);

        CertificationOutcome::Accepted {
            events: vec![DomainEvent::TitleTransferred {
                work_id: attrs.reference,
                owner: attrs.owner,
            }],
        }
    }

    async fn certify_license(&self, claim: &Claim) -> Result<CertificationOutcome, RulesError> {
        let attrs = match LicenseAttributes::parse(claim) {
            Ok(a) => a,
            Err(reason) => return Ok(CertificationOutcome::rejected(reason)),
        };

        let work = match self.state.work(&attrs.reference) {
            Some(w) => w,
            None => {
                return Ok(CertificationOutcome::rejected(format!(
                    "license references unknown work {}",
                    attrs.reference
                )))
            }
        };

        match attrs.proof_type.as_deref() {
            Some(fields::PROOF_TYPE_BITCOIN) => self.certify_paid_license(claim, &attrs, &work).await,
            Some(fields::PROOF_TYPE_SELF_OWNED) => Ok(self.certify_self_license(claim, &attrs, &work)),
            Some(other) => Ok(CertificationOutcome::rejected(format!(
                "unknown proof type: {}",
                other
            ))),
            None => Ok(CertificationOutcome::rejected("license has no proof type")),
        }
    }

    /// Bitcoin-transaction proof: the only hook with an external
    /// dependency. The payment must land on the offering's address with
    /// the offering's price.
    async fn certify_paid_license(
        &self,
        claim: &Claim,
        attrs: &LicenseAttributes,
        work: &Work,
    ) -> Result<CertificationOutcome, RulesError> {
        let offering = match attrs.reference_offering.and_then(|id| self.state.offering(&id)) {
            Some(o) => o,
            None => return Ok(CertificationOutcome::rejected("referred offering not found")),
        };

        let owner_on_record = match self.state.owner_of(&work.id) {
            Some(o) => o,
            None => return Ok(CertificationOutcome::rejected("no owner on record")),
        };
        let owner_stated = match &attrs.reference_owner {
            Some(o) => o.clone(),
            None => return Ok(CertificationOutcome::rejected("no owner on claim")),
        };
        if owner_stated != owner_on_record {
            return Ok(CertificationOutcome::rejected("different owner on record"));
        }

        let proof = match attrs.proof_value.as_deref().map(ProofValue::parse) {
            Some(Ok(p)) => p,
            Some(Err(reason)) => return Ok(CertificationOutcome::rejected(reason)),
            None => return Ok(CertificationOutcome::rejected("license has no proof value")),
        };

        // Normalized-id lookup first; wallets quote the ntxid before the
        // transaction confirms. Fall back to the raw txid.
        let txid = match self.oracle.resolve_ntxid(&proof.ntx_id).await? {
            Some(txid) => txid,
            None => proof.tx_id.clone(),
        };
        let tx: TransactionInfo = match self.oracle.transaction(&txid).await? {
            Some(tx) => tx,
            None => return Ok(CertificationOutcome::rejected("no tx found")),
        };

        let output = match tx.outputs.get(proof.output_index) {
            Some(o) => o,
            None => return Ok(CertificationOutcome::rejected("no output found")),
        };
        if !output
            .addresses
            .iter()
            .any(|a| a == &offering.payment_address)
        {
            return Ok(CertificationOutcome::rejected(
                "no output with matching address found",
            ));
        }
        if (output.value - offering.payment_amount).abs() >= PAYMENT_TOLERANCE {
            return Ok(CertificationOutcome::rejected("mismatching amount"));
        }

        let holder = match &attrs.license_holder {
            Some(h) => h.clone(),
            None => return Ok(CertificationOutcome::rejected("license has no holder")),
        };
        self.state.get_or_create_profile(&holder);
        self.state.get_or_create_profile(&owner_on_record);

        self.state.add_license(License {
            id: claim.id,
            work: work.id,
            holder: holder.clone(),
            emitter: owner_on_record.clone(),
            proof_type: fields::PROOF_TYPE_BITCOIN.to_string(),
            bitcoin_tx: Some(proof.tx_id),
        });
        self.state.append_publisher(&work.id, &holder);

        Ok(CertificationOutcome::Accepted {
            events: vec![
                DomainEvent::LicenseBought {
                    claim_id: claim.id,
                    work_id: work.id,
                    holder,
                },
                DomainEvent::LicenseSold {
                    claim_id: claim.id,
                    work_id: work.id,
                    owner: owner_on_record,
                },
            ],
        })
    }

    fn certify_self_license(
        &self,
        claim: &Claim,
        attrs: &LicenseAttributes,
        work: &Work,
    ) -> CertificationOutcome {
        let owner_on_record = self.state.owner_of(&work.id);
        if let (Some(record), Some(stated)) = (&owner_on_record, &attrs.reference_owner) {
            if record != stated {
                return CertificationOutcome::rejected("different owner on record");
            }
        }

        let owner = match owner_on_record.or_else(|| attrs.reference_owner.clone()) {
            Some(o) => o,
            None => return CertificationOutcome::rejected("no owner on record"),
        };
        if attrs.license_holder.as_deref() != Some(owner.as_str()) {
            return CertificationOutcome::rejected("self license holder is not the owner");
        }

        self.state.get_or_create_profile(&owner);
        self.state.add_license(License {
            id: claim.id,
            work: work.id,
            holder: owner.clone(),
            emitter: owner.clone(),
            proof_type: fields::PROOF_TYPE_SELF_OWNED.to_string(),
            bitcoin_tx: None,
        });
        self.state.append_publisher(&work.id, &owner);

        CertificationOutcome::Accepted {
            events: vec![DomainEvent::SelfLicense {
                claim_id: claim.id,
                work_id: work.id,
                owner,
            }],
        }
    }

    fn certify_offering(
        &self,
        claim: &Claim,
        batch_work: Option<ClaimId>,
    ) -> Result<CertificationOutcome, RulesError> {
        let attrs = match OfferingAttributes::parse(claim) {
            Ok(a) => a,
            Err(reason) => return Ok(CertificationOutcome::rejected(reason)),
        };

        let work_id = match attrs.reference.or(batch_work) {
            Some(id) => id,
            // No reference and nothing to borrow: the client broke the
            // protocol, which is a hard error rather than a rejection.
            None => return Err(RulesError::OfferingWithoutWork),
        };
        if self.state.work(&work_id).is_none() {
            return Ok(CertificationOutcome::rejected(format!(
                "offering references unknown work {}",
                work_id
            )));
        }

        self.state.add_offering(Offering {
            id: claim.id,
            work: work_id,
            payment_address: attrs.payment_address,
            payment_amount: attrs.payment_amount,
        });

        Ok(CertificationOutcome::Accepted { events: vec![] })
    }

    fn certify_profile(&self, claim: &Claim) -> CertificationOutcome {
        let public_key = claim.public_key.to_hex();
        self.state.update_profile(&public_key, &claim.attributes);
        CertificationOutcome::Accepted {
            events: vec![DomainEvent::ProfileUpdated { public_key }],
        }
    }

    fn certify_revocation(&self, claim: &Claim) -> CertificationOutcome {
        let reference = match claim.attribute(fields::REFERENCE) {
            Some(s) => match ClaimId::from_hex(s) {
                Ok(id) => id,
                Err(_) => {
                    return CertificationOutcome::rejected(format!(
                        "malformed reference id: {}",
                        s
                    ))
                }
            },
            None => return CertificationOutcome::rejected("revocation has no reference"),
        };
        self.state.add_revocation(claim.id, reference);
        CertificationOutcome::Accepted {
            events: vec![DomainEvent::ClaimRevoked {
                claim_id: claim.id,
                reference,
            }],
        }
    }
}
