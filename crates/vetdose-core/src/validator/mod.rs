//! Calculation validation and risk classification.
//!
//! Pipeline: Classify → Re-derive independently → Compare within tolerance →
//! Range checks → Critical-drug screen → Risk level.
//!
//! A discrepancy beyond tolerance is always an error. `requires_manual_review`
//! is the one flag a caller must honor before presenting a calculation.

mod cross_check;
mod ranges;

pub use cross_check::{compare, cross_check, relative_error, rederive, Discrepancy, Rederived};
pub use ranges::{
    check_infusion_dose, check_single_dose, is_critical, range_for, DoseBasis, RangeViolation,
    SafeRange, CRITICAL_DRUGS, SAFE_RANGES,
};

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::calculator::InfusionCalculator;
use crate::config::EngineConfig;
use crate::extract::{self, patterns, ExtractionOutcome, Extractor};
use crate::models::{
    CalculationResult, CalculationType, InfusionRequest, IssueKind, QueryContext, RiskLevel,
    SafetyIssue, StepTrace, ValidationResult, VerificationMethod,
};
use crate::registry::DrugRegistry;

const CRI_CONFIDENCE: f64 = 0.95;
const SIMPLE_CONFIDENCE: f64 = 0.98;
const ERROR_CONFIDENCE_CRI: f64 = 0.3;
const ERROR_CONFIDENCE_SIMPLE: f64 = 0.5;
const HEURISTIC_CONFIDENCE_CAP: f64 = 0.5;

#[allow(clippy::expect_used)]
static MULTI_DRUG_WORDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:multiple|combination|combined)\b.*\bdrugs?\b|\bdrugs?\b.*\b(?:together|combined)\b")
        .expect("static pattern compiles")
});

#[allow(clippy::expect_used)]
static SIMPLE_DOSING_WORDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:dose|dosage|dosing|tablets?|capsules?)\b").expect("static pattern compiles")
});

/// Accumulates typed findings and their human-readable strings.
#[derive(Debug, Default)]
struct Findings {
    issues: Vec<SafetyIssue>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Findings {
    fn error(&mut self, kind: IssueKind, message: impl Into<String>) {
        let message = message.into();
        self.errors.push(message.clone());
        self.issues.push(SafetyIssue {
            kind,
            fatal: true,
            message,
        });
    }

    fn warn(&mut self, kind: IssueKind, message: impl Into<String>) {
        let message = message.into();
        self.warnings.push(message.clone());
        self.issues.push(SafetyIssue {
            kind,
            fatal: false,
            message,
        });
    }

    fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn has(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }
}

/// Independently verifies calculations and assigns risk.
pub struct CalculationValidator {
    registry: Arc<DrugRegistry>,
    config: EngineConfig,
    calculator: InfusionCalculator,
    extractor: Extractor,
}

impl CalculationValidator {
    pub fn new(registry: Arc<DrugRegistry>) -> Self {
        Self::with_config(registry, &EngineConfig::default())
    }

    pub fn with_config(registry: Arc<DrugRegistry>, config: &EngineConfig) -> Self {
        Self {
            calculator: InfusionCalculator::with_config(Arc::clone(&registry), config),
            extractor: Extractor::new(config),
            registry,
            config: config.clone(),
        }
    }

    /// Classify and validate the calculation described by `text` and `context`.
    pub fn validate(&self, text: &str, context: &QueryContext) -> ValidationResult {
        let calculation_type = self.classify(text, context);
        log::info!("validating {:?} calculation", calculation_type);

        match calculation_type {
            CalculationType::CriCalculation => self.validate_cri(text, context),
            CalculationType::SimpleDosing => self.validate_simple(text, context),
            CalculationType::MultiDrug => multi_drug_result(),
            CalculationType::Unrecognized => unrecognized_result(),
        }
    }

    pub fn classify(&self, text: &str, context: &QueryContext) -> CalculationType {
        if context.request.is_some() || extract::is_infusion_query(text) || patterns::DOSE_RATE.is_match(text) {
            return CalculationType::CriCalculation;
        }

        let mentioned = extract::extract_context_with(text, &self.registry).merge(context.clone());
        if mentioned.drugs.len() >= 2 || MULTI_DRUG_WORDING.is_match(text) {
            return CalculationType::MultiDrug;
        }

        if patterns::DOSE_PER_KG.is_match(text) || SIMPLE_DOSING_WORDING.is_match(text) {
            return CalculationType::SimpleDosing;
        }
        CalculationType::Unrecognized
    }

    /// Validate a structured infusion request, computing the result when none is given.
    pub fn validate_calculation(
        &self,
        request: &InfusionRequest,
        result: Option<&CalculationResult>,
    ) -> ValidationResult {
        let mut findings = Findings::default();
        let mut trace = StepTrace::new();
        let methods = vec![
            VerificationMethod::CrossCalculation,
            VerificationMethod::RangeChecking,
            VerificationMethod::VolumeDisplacement,
            VerificationMethod::CriticalDrugScreen,
        ];

        let canonical: Vec<String> = request
            .drugs
            .iter()
            .map(|d| self.registry.canonical_name(&d.name))
            .collect();
        let critical = canonical.iter().any(|name| is_critical(name));

        let computed;
        let result = match result {
            Some(result) => Some(result),
            None => match self.calculator.compute(request) {
                Ok(r) => {
                    computed = r;
                    Some(&computed)
                }
                Err(e) => {
                    findings.error(e.issue_kind(), e.to_string());
                    None
                }
            },
        };

        match rederive(request, &mut trace) {
            Ok(rederived) => {
                if let Some(result) = result {
                    for discrepancy in compare(&rederived, result, self.config.relative_tolerance) {
                        log::warn!("calculation discrepancy in {}", discrepancy.quantity);
                        findings.error(IssueKind::CalculationDiscrepancy, discrepancy.describe());
                    }
                }

                for ((name, dose, _), canonical) in rederived.drugs.iter().zip(&canonical) {
                    if let Some(violation) = check_infusion_dose(canonical, *dose) {
                        if is_critical(canonical) {
                            findings.error(
                                IssueKind::UnsafeDoseRange,
                                format!("Critical drug {} out of safe range: {}", name, violation),
                            );
                        } else {
                            findings.warn(IssueKind::UnsafeDoseRange, violation.to_string());
                        }
                    }
                }

                let displacement = rederived.total_drug_volume_ml / request.bag_volume_ml;
                if displacement > self.config.displacement_warning_fraction {
                    findings.warn(
                        IssueKind::VolumeDisplacement,
                        format!(
                            "High volume displacement: {:.1}% of bag volume",
                            displacement * 100.0
                        ),
                    );
                }
            }
            Err(e) => {
                if !findings.has(e.issue_kind()) {
                    findings.error(e.issue_kind(), e.to_string());
                }
            }
        }

        for drug in &request.drugs {
            if self
                .registry
                .resolve_with_threshold(&drug.name, self.config.fuzzy_name_threshold)
                .is_none()
            {
                findings.warn(
                    IssueKind::UnknownDrug,
                    format!("No mechanism data for {}; interaction screening is limited", drug.name),
                );
            }
        }

        if request.drugs.len() > self.config.max_confident_drugs {
            findings.warn(
                IssueKind::MultiDrugUnsupported,
                format!(
                    "{} drugs in one infusion exceeds the {} that can be checked with confidence",
                    request.drugs.len(),
                    self.config.max_confident_drugs
                ),
            );
        }

        if request.is_heuristic() {
            let fields: Vec<String> = request
                .provenance
                .substituted()
                .iter()
                .map(|f| f.to_string())
                .collect();
            findings.warn(
                IssueKind::HeuristicInput,
                format!("Heuristic estimate: assumed {}", fields.join(", ")),
            );
        }

        let mut confidence = if findings.has_errors() {
            ERROR_CONFIDENCE_CRI
        } else {
            CRI_CONFIDENCE
        };
        if request.is_heuristic() {
            confidence = confidence.min(HEURISTIC_CONFIDENCE_CAP);
        }

        let risk_level = if critical || findings.has_errors() {
            RiskLevel::Critical
        } else {
            RiskLevel::High
        };

        let requires_manual_review = risk_level == RiskLevel::Critical
            || findings.has_errors()
            || findings.has(IssueKind::HeuristicInput)
            || findings.has(IssueKind::MultiDrugUnsupported);

        ValidationResult {
            is_valid: !findings.has_errors(),
            confidence,
            risk_level,
            errors: findings.errors,
            warnings: findings.warnings,
            issues: findings.issues,
            calculation_steps: trace.into_steps(),
            verification_methods: methods,
            requires_manual_review,
            calculation_type: CalculationType::CriCalculation,
        }
    }

    fn validate_cri(&self, text: &str, context: &QueryContext) -> ValidationResult {
        if let Some(request) = &context.request {
            return self.validate_calculation(request, context.result.as_ref());
        }
        match self.extractor.extract(text) {
            ExtractionOutcome::Complete(request) => self.validate_calculation(&request, None),
            ExtractionOutcome::Incomplete { missing } => {
                let mut findings = Findings::default();
                for field in &missing {
                    findings.error(IssueKind::Incomplete, format!("Missing parameter: {}", field));
                }
                findings.warn(IssueKind::Incomplete, "CRITICAL CALCULATION ERROR - DO NOT USE");
                failed_result(findings, RiskLevel::Critical, CalculationType::CriCalculation)
            }
        }
    }

    fn validate_simple(&self, text: &str, context: &QueryContext) -> ValidationResult {
        let mut findings = Findings::default();
        let mut trace = StepTrace::new();
        let mut methods = vec![
            VerificationMethod::RangeChecking,
            VerificationMethod::CriticalDrugScreen,
        ];

        let weight = extract::extract_weight(text).or(context.weight_kg);
        let dose = single_dose_mg_per_kg(text);
        let drug = extract::extract_context_with(text, &self.registry)
            .drugs
            .into_iter()
            .next()
            .or_else(|| context.drugs.first().map(|d| self.registry.canonical_name(d)));

        let (Some(weight), Some(dose)) = (weight, dose) else {
            if weight.is_none() {
                findings.error(IssueKind::Incomplete, "Missing parameter: patient weight");
            }
            if dose.is_none() {
                findings.error(IssueKind::Incomplete, "Missing parameter: dose per kg");
            }
            findings.warn(IssueKind::Incomplete, "CRITICAL CALCULATION ERROR - DO NOT USE");
            return failed_result(findings, RiskLevel::Critical, CalculationType::SimpleDosing);
        };

        let total = trace.record(
            "Calculate total dose",
            "Total dose (mg) = Dose (mg/kg) × Weight (kg)",
            &[("dose_mg_per_kg", dose), ("weight_kg", weight)],
            dose * weight,
            "mg",
        );

        if let Some(stated) = stated_total_mg(text) {
            methods.insert(0, VerificationMethod::CrossCalculation);
            let error = relative_error(total, stated);
            if error > self.config.relative_tolerance {
                findings.error(
                    IssueKind::CalculationDiscrepancy,
                    format!(
                        "Calculation discrepancy in total dose: stated {:.4} mg, expected {:.4} mg ({:.1}% difference)",
                        stated,
                        total,
                        error * 100.0
                    ),
                );
            }
        }

        let critical = drug.as_deref().map_or(false, is_critical);
        if let Some(drug) = &drug {
            if let Some(violation) = check_single_dose(drug, dose) {
                if critical {
                    findings.error(
                        IssueKind::UnsafeDoseRange,
                        format!("Critical drug {} out of safe range: {}", drug, violation),
                    );
                } else {
                    findings.warn(IssueKind::UnsafeDoseRange, violation.to_string());
                }
            }
        }

        let risk_level = if critical || findings.has_errors() {
            RiskLevel::Critical
        } else if findings.warnings.is_empty() {
            RiskLevel::Low
        } else {
            RiskLevel::Medium
        };
        let confidence = if findings.has_errors() {
            ERROR_CONFIDENCE_SIMPLE
        } else {
            SIMPLE_CONFIDENCE
        };

        ValidationResult {
            is_valid: !findings.has_errors(),
            confidence,
            risk_level,
            requires_manual_review: risk_level == RiskLevel::Critical || findings.has_errors(),
            errors: findings.errors,
            warnings: findings.warnings,
            issues: findings.issues,
            calculation_steps: trace.into_steps(),
            verification_methods: methods,
            calculation_type: CalculationType::SimpleDosing,
        }
    }
}

/// First per-kg dose that is not a rate, in mg/kg.
fn single_dose_mg_per_kg(text: &str) -> Option<f64> {
    patterns::DOSE_PER_KG.captures_iter(text).find_map(|caps| {
        if caps.get(3).is_some() {
            return None;
        }
        let value = patterns::parse_number(caps.get(1)?.as_str())?;
        let micro = !caps.get(2)?.as_str().eq_ignore_ascii_case("mg");
        Some(if micro { value / 1000.0 } else { value })
    })
}

fn stated_total_mg(text: &str) -> Option<f64> {
    patterns::STATED_TOTAL_MG
        .captures(text)
        .and_then(|caps| patterns::parse_number(caps.get(1)?.as_str()))
}

fn failed_result(findings: Findings, risk_level: RiskLevel, calculation_type: CalculationType) -> ValidationResult {
    ValidationResult {
        is_valid: false,
        confidence: 0.0,
        risk_level,
        errors: findings.errors,
        warnings: findings.warnings,
        issues: findings.issues,
        calculation_steps: Vec::new(),
        verification_methods: Vec::new(),
        requires_manual_review: true,
        calculation_type,
    }
}

fn multi_drug_result() -> ValidationResult {
    let mut findings = Findings::default();
    findings.error(
        IssueKind::MultiDrugUnsupported,
        "Multi-drug calculations require manual review",
    );
    findings.warn(
        IssueKind::MultiDrugUnsupported,
        "Complex drug combinations need veterinary oversight",
    );
    failed_result(findings, RiskLevel::Critical, CalculationType::MultiDrug)
}

fn unrecognized_result() -> ValidationResult {
    let mut findings = Findings::default();
    findings.error(IssueKind::Incomplete, "Calculation type not recognized");
    failed_result(findings, RiskLevel::High, CalculationType::Unrecognized)
}
