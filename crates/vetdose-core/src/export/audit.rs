//! Audit records for completed calculations.
//!
//! A record carries the request, the result, the validation and any
//! interactions, plus a SHA-256 digest over the canonical JSON of the
//! request and result so a stored record can be checked and replayed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::calculator::{CalcError, InfusionCalculator};
use crate::models::{CalculationResult, DrugInteraction, InfusionRequest, ValidationResult};

pub const AUDIT_FORMAT_VERSION: &str = "1.0";
pub const AUDIT_HASH_ALGORITHM: &str = "SHA-256";

/// Absolute tolerance when replaying a stored calculation.
pub const REPLAY_TOLERANCE: f64 = 1e-9;

/// Audit errors.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Digest mismatch: expected {expected}, computed {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Replay mismatch in {quantity}: stored {stored}, replayed {replayed}")]
    ReplayMismatch {
        quantity: String,
        stored: f64,
        replayed: f64,
    },

    #[error("Replay failed: {0}")]
    Calculation(#[from] CalcError),
}

pub type AuditResult<T> = Result<T, AuditError>;

/// Audit record metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditMetadata {
    /// Record identifier (UUID v4)
    pub record_id: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Record format version
    pub format_version: String,
    /// Hash algorithm used for `digest`
    pub hash_algorithm: String,
}

/// Self-verifying record of one assessed calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditRecord {
    pub metadata: AuditMetadata,
    /// Hex SHA-256 of the canonical request and result
    pub digest: String,
    pub request: InfusionRequest,
    pub result: CalculationResult,
    pub validation: ValidationResult,
    pub interactions: Vec<DrugInteraction>,
}

pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Digest over the canonical (compact, field-ordered) JSON of request and result.
pub fn calculation_digest(
    request: &InfusionRequest,
    result: &CalculationResult,
) -> AuditResult<String> {
    let canonical = serde_json::to_string(&(request, result))?;
    Ok(hash_data(canonical.as_bytes()))
}

impl AuditRecord {
    pub fn new(
        request: InfusionRequest,
        result: CalculationResult,
        validation: ValidationResult,
        interactions: Vec<DrugInteraction>,
    ) -> AuditResult<Self> {
        let digest = calculation_digest(&request, &result)?;
        let metadata = AuditMetadata {
            record_id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            format_version: AUDIT_FORMAT_VERSION.to_string(),
            hash_algorithm: AUDIT_HASH_ALGORITHM.to_string(),
        };
        log::debug!("created audit record {} ({})", metadata.record_id, digest);

        Ok(Self {
            metadata,
            digest,
            request,
            result,
            validation,
            interactions,
        })
    }

    /// Recompute the digest and compare it with the stored one.
    pub fn verify_digest(&self) -> AuditResult<()> {
        let actual = calculation_digest(&self.request, &self.result)?;
        if actual != self.digest {
            log::warn!("audit record {} failed digest check", self.metadata.record_id);
            return Err(AuditError::DigestMismatch {
                expected: self.digest.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Recompute the stored request and compare every figure with the stored result.
    pub fn replay(&self, calculator: &InfusionCalculator) -> AuditResult<()> {
        let replayed = calculator.compute(&self.request)?;
        let stored = &self.result;

        let mut pairs = vec![
            ("total run time".to_string(), stored.total_run_time_hours, replayed.total_run_time_hours),
            ("flow rate".to_string(), stored.flow_rate_ml_per_hour, replayed.flow_rate_ml_per_hour),
            ("total drug volume".to_string(), stored.total_drug_volume_ml, replayed.total_drug_volume_ml),
            ("final bag volume".to_string(), stored.final_bag_volume_ml, replayed.final_bag_volume_ml),
        ];
        if stored.drug_volumes.len() != replayed.drug_volumes.len() {
            return Err(AuditError::ReplayMismatch {
                quantity: "drug count".into(),
                stored: stored.drug_volumes.len() as f64,
                replayed: replayed.drug_volumes.len() as f64,
            });
        }
        for (s, r) in stored.drug_volumes.iter().zip(&replayed.drug_volumes) {
            pairs.push((format!("{} volume", s.display_name), s.volume_to_add_ml, r.volume_to_add_ml));
        }

        for (quantity, stored, replayed) in pairs {
            if !((stored - replayed).abs() <= REPLAY_TOLERANCE) {
                return Err(AuditError::ReplayMismatch {
                    quantity,
                    stored,
                    replayed,
                });
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> AuditResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Concentration, DoseRate, DoseUnit, InfusionDrug};
    use crate::registry::DrugRegistry;
    use crate::validator::CalculationValidator;

    fn record() -> (AuditRecord, InfusionCalculator) {
        let calculator = InfusionCalculator::new(DrugRegistry::shared());
        let request = InfusionRequest::new(
            10.0,
            500.0,
            10.0,
            vec![InfusionDrug::new(
                "Dopamine",
                DoseRate::new(5.0, DoseUnit::McgPerKgPerMinute),
                Concentration::mg_per_ml(40.0),
            )],
        );
        let result = calculator.compute(&request).unwrap();
        let validation = CalculationValidator::new(DrugRegistry::shared())
            .validate_calculation(&request, Some(&result));
        let record = AuditRecord::new(request, result, validation, Vec::new()).unwrap();
        (record, calculator)
    }

    #[test]
    fn test_hash_data() {
        assert_eq!(
            hash_data(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_new_record_verifies_and_replays() {
        let (record, calculator) = record();
        assert_eq!(record.metadata.format_version, "1.0");
        assert_eq!(record.metadata.hash_algorithm, "SHA-256");
        assert_eq!(record.digest.len(), 64);
        record.verify_digest().unwrap();
        record.replay(&calculator).unwrap();
    }

    #[test]
    fn test_tampered_result_fails_digest() {
        let (mut record, _) = record();
        record.result.drug_volumes[0].volume_to_add_ml = 0.075;
        assert!(matches!(
            record.verify_digest(),
            Err(AuditError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn test_rehashed_tampering_fails_replay() {
        let (mut record, calculator) = record();
        record.result.drug_volumes[0].volume_to_add_ml = 0.075;
        record.digest = calculation_digest(&record.request, &record.result).unwrap();

        record.verify_digest().unwrap();
        match record.replay(&calculator) {
            Err(AuditError::ReplayMismatch { quantity, .. }) => {
                assert_eq!(quantity, "Dopamine volume")
            }
            other => panic!("expected replay mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_json_round_trip_keeps_digest_valid() {
        let (record, _) = record();
        let json = record.to_json().unwrap();
        let restored = AuditRecord::from_json(&json).unwrap();
        assert_eq!(restored, record);
        restored.verify_digest().unwrap();
    }
}
