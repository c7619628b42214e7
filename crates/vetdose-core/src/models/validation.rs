//! Calculation validation models.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::calculation::CalculationStep;

/// Kind of calculation being validated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CalculationType {
    SimpleDosing,
    CriCalculation,
    MultiDrug,
    Unrecognized,
}

impl CalculationType {
    pub fn label(&self) -> &'static str {
        match self {
            CalculationType::SimpleDosing => "simple_dosing",
            CalculationType::CriCalculation => "cri_calculation",
            CalculationType::MultiDrug => "multi_drug",
            CalculationType::Unrecognized => "unrecognized",
        }
    }
}

/// Engine-assigned risk level, ordered from low to critical.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Safety finding taxonomy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Required field missing
    Incomplete,
    /// Zero or negative flow rate / duration
    DivisionByZero,
    /// Independent re-derivation disagrees beyond tolerance
    CalculationDiscrepancy,
    /// Dose outside curated safe bounds
    UnsafeDoseRange,
    /// Added drug volume displaces a large share of the bag
    VolumeDisplacement,
    /// No registry entry for a drug
    UnknownDrug,
    /// Too many drugs to reason about confidently
    MultiDrugUnsupported,
    /// Request contains heuristic defaults
    HeuristicInput,
}

/// A single typed finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SafetyIssue {
    pub kind: IssueKind,
    /// Fatal issues invalidate the calculation
    pub fatal: bool,
    pub message: String,
}

/// Verification technique applied during validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    CrossCalculation,
    RangeChecking,
    VolumeDisplacement,
    CriticalDrugScreen,
}

/// Outcome of validating a calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    /// No fatal issue was found
    pub is_valid: bool,
    /// Confidence in the result (0.0 - 1.0)
    pub confidence: f64,
    /// Assigned risk level
    pub risk_level: RiskLevel,
    /// Fatal findings, human readable
    pub errors: Vec<String>,
    /// Non-fatal findings, human readable
    pub warnings: Vec<String>,
    /// Typed findings backing `errors` and `warnings`
    pub issues: Vec<SafetyIssue>,
    /// Independently re-derived steps
    pub calculation_steps: Vec<CalculationStep>,
    /// Verification techniques applied
    pub verification_methods: Vec<VerificationMethod>,
    /// Single authoritative gate: must be honored before presenting results
    pub requires_manual_review: bool,
    /// What was validated
    pub calculation_type: CalculationType,
}

impl ValidationResult {
    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }

    pub fn fatal_issues(&self) -> impl Iterator<Item = &SafetyIssue> {
        self.issues.iter().filter(|i| i.fatal)
    }
}
