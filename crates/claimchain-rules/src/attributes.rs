//! Typed per-kind attribute views.
//!
//! Claims carry an open string map on the wire; each hook parses that map
//! into one of these structs immediately after dispatch, so rule logic
//! never re-reads raw strings. A parse failure is an ordinary rejection
//! reason, never a panic.

use serde::{Deserialize, Serialize};

use claimchain_core::{fields, Claim, ClaimId};

/// Attributes the WORK hook reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkAttributes {
    pub author: Option<String>,
    pub name: String,
    pub supersedes: Option<ClaimId>,
}

impl WorkAttributes {
    pub fn parse(claim: &Claim) -> Result<Self, String> {
        let supersedes = match claim.attribute(fields::SUPERSEDES) {
            Some(s) => Some(
                ClaimId::from_hex(s).map_err(|_| format!("malformed supersedes id: {}", s))?,
            ),
            None => None,
        };
        Ok(Self {
            author: claim.attribute(fields::AUTHOR).map(str::to_string),
            name: claim
                .attribute(fields::WORK_NAME)
                .unwrap_or_default()
                .to_string(),
            supersedes,
        })
    }
}

/// Attributes the TITLE hook reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleAttributes {
    pub reference: ClaimId,
    pub owner: String,
}

impl TitleAttributes {
    pub fn parse(claim: &Claim) -> Result<Self, String> {
        let reference = claim
            .attribute(fields::REFERENCE)
            .ok_or_else(|| "title has no reference".to_string())?;
        let reference = ClaimId::from_hex(reference)
            .map_err(|_| format!("malformed reference id: {}", reference))?;
        let owner = claim
            .attribute(fields::OWNER)
            .ok_or_else(|| "title has no owner".to_string())?
            .to_string();
        Ok(Self { reference, owner })
    }
}

/// Attributes the LICENSE hook reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseAttributes {
    pub reference: ClaimId,
    pub reference_offering: Option<ClaimId>,
    pub reference_owner: Option<String>,
    pub license_holder: Option<String>,
    pub proof_type: Option<String>,
    pub proof_value: Option<String>,
}

impl LicenseAttributes {
    pub fn parse(claim: &Claim) -> Result<Self, String> {
        let reference = claim
            .attribute(fields::REFERENCE)
            .ok_or_else(|| "license has no reference".to_string())?;
        let reference = ClaimId::from_hex(reference)
            .map_err(|_| format!("malformed reference id: {}", reference))?;
        let reference_offering = match claim.attribute(fields::REFERENCE_OFFERING) {
            Some(s) => Some(
                ClaimId::from_hex(s).map_err(|_| format!("malformed offering id: {}", s))?,
            ),
            None => None,
        };
        Ok(Self {
            reference,
            reference_offering,
            reference_owner: claim.attribute(fields::REFERENCE_OWNER).map(str::to_string),
            license_holder: claim.attribute(fields::LICENSE_HOLDER).map(str::to_string),
            proof_type: claim.attribute(fields::PROOF_TYPE).map(str::to_string),
            proof_value: claim.attribute(fields::PROOF_VALUE).map(str::to_string),
        })
    }
}

/// Attributes the OFFERING hook reads.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferingAttributes {
    /// Absent when the batch's WORK claim supplies the reference.
    pub reference: Option<ClaimId>,
    pub payment_address: String,
    pub payment_amount: f64,
}

impl OfferingAttributes {
    pub fn parse(claim: &Claim) -> Result<Self, String> {
        let reference = match claim.attribute(fields::REFERENCE) {
            Some(s) => Some(
                ClaimId::from_hex(s).map_err(|_| format!("malformed reference id: {}", s))?,
            ),
            None => None,
        };
        let payment_address = claim
            .attribute(fields::PAYMENT_ADDRESS)
            .ok_or_else(|| "offering has no payment address".to_string())?
            .to_string();
        let payment_amount = claim
            .attribute(fields::PAYMENT_AMOUNT)
            .ok_or_else(|| "offering has no payment amount".to_string())?;
        let payment_amount = payment_amount
            .parse::<f64>()
            .map_err(|_| format!("malformed payment amount: {}", payment_amount))?;
        Ok(Self {
            reference,
            payment_address,
            payment_amount,
        })
    }
}

/// The JSON payment evidence attached to bitcoin-transaction proofs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofValue {
    #[serde(rename = "txId")]
    pub tx_id: String,

    #[serde(rename = "ntxId")]
    pub ntx_id: String,

    #[serde(rename = "outputIndex")]
    pub output_index: usize,
}

impl ProofValue {
    pub fn parse(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| format!("invalid proof value json: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimchain_core::{ClaimBuilder, ClaimKind, Keypair};

    #[test]
    fn test_license_attributes_parse() {
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let reference = ClaimId::from_bytes([0x11; 32]);
        let claim = ClaimBuilder::new(ClaimKind::License)
            .attribute(fields::REFERENCE, reference.to_hex())
            .attribute(fields::PROOF_TYPE, fields::PROOF_TYPE_BITCOIN)
            .sign(&keypair);

        let attrs = LicenseAttributes::parse(&claim).unwrap();
        assert_eq!(attrs.reference, reference);
        assert_eq!(attrs.proof_type.as_deref(), Some(fields::PROOF_TYPE_BITCOIN));
        assert_eq!(attrs.license_holder, None);
    }

    #[test]
    fn test_license_without_reference_is_a_parse_failure() {
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let claim = ClaimBuilder::new(ClaimKind::License).sign(&keypair);
        assert!(LicenseAttributes::parse(&claim).is_err());
    }

    #[test]
    fn test_proof_value_parse() {
        let raw = r#"{"txId":"aa","ntxId":"bb","outputIndex":2}"#;
        let proof = ProofValue::parse(raw).unwrap();
        assert_eq!(proof.tx_id, "aa");
        assert_eq!(proof.ntx_id, "bb");
        assert_eq!(proof.output_index, 2);

        assert!(ProofValue::parse("not json").is_err());
        assert!(ProofValue::parse(r#"{"txId":"aa"}"#).is_err());
    }

    #[test]
    fn test_offering_amount_must_be_numeric() {
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let claim = ClaimBuilder::new(ClaimKind::Offering)
            .attribute(fields::PAYMENT_ADDRESS, "addr")
            .attribute(fields::PAYMENT_AMOUNT, "one bitcoin")
            .sign(&keypair);
        assert!(OfferingAttributes::parse(&claim).is_err());
    }
}
