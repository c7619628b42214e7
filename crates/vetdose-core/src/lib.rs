//! VetDose Core Library
//!
//! Clinical dosing and safety reasoning for veterinary infusions: parameter
//! extraction, constant-rate-infusion calculation with a step trace,
//! independent cross-verification, and mechanism-based interaction screening.
//!
//! # Architecture
//!
//! ```text
//! Free-text query (+ caller context)
//!         │
//!         ▼
//!     Extractor ──── incomplete ───▶ InsufficientInformation
//!         │
//!         ▼
//!  Infusion Calculator ── error ──▶ Failed
//!         │
//!         ▼
//!  Calculation Validator  (independent re-derivation, ranges, risk)
//!         │
//!         ▼
//!  Interaction Rule Engine  (≥2 drugs; Drug Mechanism Registry)
//!         │
//!         ▼
//!   Report Generator ───▶ Assessment ───▶ Audit record (SHA-256)
//! ```
//!
//! # Core Principle
//!
//! **`requires_manual_review` is the single authoritative gate.** When it is
//! set, the figures must not be used until a veterinarian has verified them.
//!
//! # Modules
//!
//! - [`models`]: Domain types (InfusionRequest, CalculationResult, etc.)
//! - [`registry`]: Immutable drug mechanism registry with name resolution
//! - [`extract`]: Parameter extraction and query routing
//! - [`calculator`]: Infusion calculator
//! - [`validator`]: Cross-verification and risk classification
//! - [`interactions`]: Mechanism-based interaction rule engine
//! - [`export`]: Report formatting and audit records
//! - [`engine`]: End-to-end orchestration

pub mod calculator;
pub mod config;
pub mod engine;
pub mod export;
pub mod extract;
pub mod interactions;
pub mod models;
pub mod registry;
pub mod validator;

// Re-export commonly used types
pub use calculator::{CalcError, CalcResult, InfusionCalculator};
pub use config::{ConfigError, ConfigResult, EngineConfig};
pub use engine::{Assessment, DosingEngine, EngineOutcome, InteractionScreen};
pub use export::{AuditError, AuditRecord, AuditResult};
pub use extract::{is_infusion_query, ExtractionOutcome, Extractor, MissingField};
pub use interactions::InteractionEngine;
pub use models::{
    CalculationResult, CalculationStep, CalculationType, Concentration, ConcentrationUnit,
    DoseRate, DoseUnit, DrugInteraction, DrugMechanism, FlowSpec, InfusionDrug, InfusionRequest,
    IssueKind, Provenance, QueryContext, RiskLevel, Severity, ValidationResult,
};
pub use registry::DrugRegistry;
pub use validator::CalculationValidator;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::Arc;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::ConfigurationError(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::SerializationError(e.to_string())
    }
}

impl From<CalcError> for EngineError {
    fn from(e: CalcError) -> Self {
        EngineError::InvalidInput(e.to_string())
    }
}

impl From<AuditError> for EngineError {
    fn from(e: AuditError) -> Self {
        match e {
            AuditError::Json(e) => EngineError::SerializationError(e.to_string()),
            other => EngineError::AuditError(other.to_string()),
        }
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Create an engine with the default configuration.
#[uniffi::export]
pub fn new_engine() -> Arc<VetDoseCore> {
    Arc::new(VetDoseCore {
        engine: DosingEngine::new(),
    })
}

/// Create an engine from a JSON configuration.
#[uniffi::export]
pub fn new_engine_with_config(json: String) -> Result<Arc<VetDoseCore>, EngineError> {
    let config = EngineConfig::from_json(&json)?;
    Ok(Arc::new(VetDoseCore {
        engine: DosingEngine::with_config(config)?,
    }))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe engine wrapper for FFI.
#[derive(uniffi::Object)]
pub struct VetDoseCore {
    engine: DosingEngine,
}

#[uniffi::export]
impl VetDoseCore {
    /// Whether the query should be routed to the dosing engine.
    pub fn is_infusion_query(&self, text: String) -> bool {
        self.engine.is_infusion_query(&text)
    }

    /// Extract, calculate, validate and screen one query.
    pub fn assess_query(&self, text: String, context: Option<FfiQueryContext>) -> FfiAssessment {
        let context = context.map(QueryContext::from).unwrap_or_default();
        self.engine.process(&text, &context).into()
    }

    /// Screen drugs against each other and patient conditions.
    pub fn check_interactions(
        &self,
        drugs: Vec<String>,
        conditions: Vec<String>,
    ) -> Vec<FfiInteraction> {
        self.engine
            .check_interactions(&drugs, &conditions)
            .into_iter()
            .map(|i| i.into())
            .collect()
    }

    /// Mechanism data for a drug name, brand name or alias.
    pub fn drug_mechanism(&self, name: String) -> Option<FfiDrugMechanism> {
        self.engine
            .registry()
            .mechanism_for(&name)
            .map(|m| m.clone().into())
    }

    /// Hepatic-metabolism tier and significance for a drug.
    pub fn hepatic_profile(&self, name: String) -> FfiHepaticProfile {
        self.engine.registry().hepatic_profile(&name).into()
    }

    /// Assess a query and return its audit record as JSON.
    pub fn audit_query(
        &self,
        text: String,
        context: Option<FfiQueryContext>,
    ) -> Result<String, EngineError> {
        let context = context.map(QueryContext::from).unwrap_or_default();
        match self.engine.process(&text, &context) {
            EngineOutcome::Assessed(a) => {
                let record = AuditRecord::new(a.request, a.result, a.validation, a.interactions)?;
                Ok(record.to_json()?)
            }
            EngineOutcome::Failed { error, .. } => Err(error.into()),
            _ => Err(EngineError::InvalidInput(
                "query does not describe a complete calculation".into(),
            )),
        }
    }

    /// Check an audit record's digest and replay its calculation.
    ///
    /// Returns `false` on a digest or replay mismatch.
    pub fn verify_audit_record(&self, json: String) -> Result<bool, EngineError> {
        let record = AuditRecord::from_json(&json)?;
        match record
            .verify_digest()
            .and_then(|_| record.replay(self.engine.calculator()))
        {
            Ok(()) => Ok(true),
            Err(AuditError::DigestMismatch { .. }) | Err(AuditError::ReplayMismatch { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe caller context.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiQueryContext {
    pub weight_kg: Option<f64>,
    pub species: Option<String>,
    pub drugs: Vec<String>,
    pub conditions: Vec<String>,
}

impl From<FfiQueryContext> for QueryContext {
    fn from(ctx: FfiQueryContext) -> Self {
        QueryContext {
            weight_kg: ctx.weight_kg,
            species: ctx.species,
            drugs: ctx.drugs,
            conditions: ctx.conditions,
            ..QueryContext::default()
        }
    }
}

/// FFI-safe per-drug volume.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDrugVolume {
    pub drug: String,
    pub display_name: String,
    pub dose_mg_per_kg_per_hour: f64,
    pub total_dose_mg: f64,
    pub concentration_mg_per_ml: f64,
    pub volume_to_add_ml: f64,
}

impl From<models::DrugVolume> for FfiDrugVolume {
    fn from(dv: models::DrugVolume) -> Self {
        Self {
            drug: dv.drug,
            display_name: dv.display_name,
            dose_mg_per_kg_per_hour: dv.dose_mg_per_kg_per_hour,
            total_dose_mg: dv.total_dose_mg,
            concentration_mg_per_ml: dv.concentration_mg_per_ml,
            volume_to_add_ml: dv.volume_to_add_ml,
        }
    }
}

/// FFI-safe calculation step.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCalculationStep {
    pub ordinal: u32,
    pub description: String,
    pub formula: String,
    pub result: f64,
    pub unit: String,
}

impl From<CalculationStep> for FfiCalculationStep {
    fn from(step: CalculationStep) -> Self {
        Self {
            ordinal: step.ordinal,
            description: step.description,
            formula: step.formula,
            result: step.result,
            unit: step.unit,
        }
    }
}

/// FFI-safe validation summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiValidation {
    pub is_valid: bool,
    pub confidence: f64,
    pub risk_level: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub requires_manual_review: bool,
    pub calculation_type: String,
}

impl From<ValidationResult> for FfiValidation {
    fn from(v: ValidationResult) -> Self {
        Self {
            is_valid: v.is_valid,
            confidence: v.confidence,
            risk_level: v.risk_level.label().to_string(),
            errors: v.errors,
            warnings: v.warnings,
            requires_manual_review: v.requires_manual_review,
            calculation_type: v.calculation_type.label().to_string(),
        }
    }
}

/// FFI-safe drug interaction.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInteraction {
    pub drug: String,
    pub partner: String,
    /// Whether `partner` is a patient condition rather than a drug
    pub partner_is_condition: bool,
    pub interaction_type: String,
    pub severity: String,
    pub mechanism: String,
    pub clinical_effect: String,
    pub management: String,
    pub confidence: f64,
}

impl From<DrugInteraction> for FfiInteraction {
    fn from(i: DrugInteraction) -> Self {
        Self {
            partner_is_condition: matches!(i.partner, models::Partner::Condition(_)),
            partner: i.partner.name().to_string(),
            drug: i.drug,
            interaction_type: i.interaction_type.label().to_string(),
            severity: i.severity.label().to_string(),
            mechanism: i.mechanism,
            clinical_effect: i.clinical_effect,
            management: i.management,
            confidence: i.confidence,
        }
    }
}

/// FFI-safe drug mechanism.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDrugMechanism {
    pub name: String,
    pub cyp_roles: Vec<String>,
    pub cyp_enzymes: Vec<String>,
    pub hepatic_metabolism_pct: Option<f64>,
    pub renal_elimination_pct: Option<f64>,
    pub protein_binding_pct: Option<f64>,
    pub therapeutic_class: String,
    pub contraindications: Vec<String>,
}

impl From<DrugMechanism> for FfiDrugMechanism {
    fn from(m: DrugMechanism) -> Self {
        Self {
            name: m.name,
            cyp_roles: m.cyp_roles.iter().map(|r| r.label().to_string()).collect(),
            cyp_enzymes: m.cyp_enzymes,
            hepatic_metabolism_pct: m.hepatic_metabolism_pct,
            renal_elimination_pct: m.renal_elimination_pct,
            protein_binding_pct: m.protein_binding_pct,
            therapeutic_class: m.therapeutic_class.label().to_string(),
            contraindications: m.contraindications,
        }
    }
}

/// FFI-safe hepatic profile.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHepaticProfile {
    pub drug: String,
    pub hepatic_metabolism_pct: Option<f64>,
    pub tier: String,
    pub principle: String,
    pub clinical_significance: String,
    pub contraindications: Vec<String>,
}

impl From<registry::HepaticProfile> for FfiHepaticProfile {
    fn from(p: registry::HepaticProfile) -> Self {
        let tier = match p.tier {
            registry::HepaticTier::High => "high",
            registry::HepaticTier::Moderate => "moderate",
            registry::HepaticTier::Low => "low",
            registry::HepaticTier::Minimal => "minimal",
            registry::HepaticTier::Unknown => "unknown",
        };
        Self {
            drug: p.drug,
            hepatic_metabolism_pct: p.hepatic_metabolism_pct,
            tier: tier.to_string(),
            principle: p.principle,
            clinical_significance: p.clinical_significance,
            contraindications: p.contraindications,
        }
    }
}

/// FFI-safe engine outcome, flattened.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAssessment {
    /// assessed, insufficient_information, failed or interactions_only
    pub outcome: String,
    /// Missing fields, human readable
    pub missing: Vec<String>,
    pub error: Option<String>,
    pub total_run_time_hours: Option<f64>,
    pub flow_rate_ml_per_hour: Option<f64>,
    pub drug_volumes: Vec<FfiDrugVolume>,
    pub total_drug_volume_ml: Option<f64>,
    pub final_bag_volume_ml: Option<f64>,
    pub steps: Vec<FfiCalculationStep>,
    pub validation: Option<FfiValidation>,
    pub interactions: Vec<FfiInteraction>,
    pub report: Option<String>,
    pub requires_manual_review: bool,
}

impl FfiAssessment {
    fn empty(outcome: &str, requires_manual_review: bool) -> Self {
        Self {
            outcome: outcome.to_string(),
            missing: Vec::new(),
            error: None,
            total_run_time_hours: None,
            flow_rate_ml_per_hour: None,
            drug_volumes: Vec::new(),
            total_drug_volume_ml: None,
            final_bag_volume_ml: None,
            steps: Vec::new(),
            validation: None,
            interactions: Vec::new(),
            report: None,
            requires_manual_review,
        }
    }
}

impl From<EngineOutcome> for FfiAssessment {
    fn from(outcome: EngineOutcome) -> Self {
        let review = outcome.requires_manual_review();
        match outcome {
            EngineOutcome::InsufficientInformation { missing } => Self {
                missing: missing.iter().map(|m| m.to_string()).collect(),
                ..Self::empty("insufficient_information", review)
            },
            EngineOutcome::Failed { error, validation } => Self {
                error: Some(error.to_string()),
                validation: Some(validation.into()),
                ..Self::empty("failed", review)
            },
            EngineOutcome::Assessed(a) => Self {
                total_run_time_hours: Some(a.result.total_run_time_hours),
                flow_rate_ml_per_hour: Some(a.result.flow_rate_ml_per_hour),
                total_drug_volume_ml: Some(a.result.total_drug_volume_ml),
                final_bag_volume_ml: Some(a.result.final_bag_volume_ml),
                drug_volumes: a.result.drug_volumes.into_iter().map(|d| d.into()).collect(),
                steps: a.result.steps.into_iter().map(|s| s.into()).collect(),
                validation: Some(a.validation.into()),
                interactions: a.interactions.into_iter().map(|i| i.into()).collect(),
                report: Some(a.report),
                ..Self::empty("assessed", review)
            },
            EngineOutcome::InteractionsOnly(screen) => Self {
                interactions: screen.interactions.into_iter().map(|i| i.into()).collect(),
                report: Some(screen.report),
                ..Self::empty("interactions_only", review)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOPAMINE: &str = "10 kg dog, 500 mL bag at 10 mL/hour, dopamine CRI at 5 µg/kg/minute, concentration 40 mg/mL";

    #[test]
    fn test_assess_query_flattens_outcome() {
        let core = new_engine();
        let assessment = core.assess_query(DOPAMINE.into(), None);
        assert_eq!(assessment.outcome, "assessed");
        assert_eq!(assessment.drug_volumes.len(), 1);
        assert!((assessment.drug_volumes[0].volume_to_add_ml - 3.75).abs() < 1e-9);
        assert!(assessment.requires_manual_review);
        assert_eq!(
            assessment.validation.unwrap().calculation_type,
            "cri_calculation"
        );
    }

    #[test]
    fn test_assess_query_reports_missing() {
        let core = new_engine();
        let assessment = core.assess_query("dopamine CRI at 5 mcg/kg/min".into(), None);
        assert_eq!(assessment.outcome, "insufficient_information");
        assert!(assessment.missing.contains(&"patient weight".to_string()));
        assert!(assessment.report.is_none());
    }

    #[test]
    fn test_config_errors_surface() {
        assert!(matches!(
            new_engine_with_config("{\"relative_tolerance\": -1.0}".into()),
            Err(EngineError::ConfigurationError(_))
        ));
        assert!(matches!(
            new_engine_with_config("not json".into()),
            Err(EngineError::ConfigurationError(_))
        ));
        assert!(new_engine_with_config("{}".into()).is_ok());
    }

    #[test]
    fn test_drug_mechanism_by_brand_name() {
        let core = new_engine();
        let mechanism = core.drug_mechanism("Rimadyl".into()).unwrap();
        assert_eq!(mechanism.name, "carprofen");
        assert!(mechanism.cyp_roles.contains(&"substrate".to_string()));
        assert!(core.drug_mechanism("UnlistedDrugX".into()).is_none());
    }

    #[test]
    fn test_check_interactions_marks_conditions() {
        let core = new_engine();
        let hits = core.check_interactions(vec!["carprofen".into()], vec!["kidney disease".into()]);
        assert!(hits
            .iter()
            .any(|h| h.partner_is_condition && h.severity == "contraindicated"));
    }

    #[test]
    fn test_audit_round_trip_through_ffi() {
        let core = new_engine();
        let json = core.audit_query(DOPAMINE.into(), None).unwrap();
        assert!(core.verify_audit_record(json.clone()).unwrap());

        let tampered = json.replacen("\"final_bag_volume_ml\": ", "\"final_bag_volume_ml\": 1", 1);
        assert_ne!(tampered, json);
        assert!(!core.verify_audit_record(tampered).unwrap());
    }
}
