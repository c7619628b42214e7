//! Query orchestration.
//!
//! Pipeline: Extract → Compute → Validate → Interactions (≥2 drugs) → Report
//!
//! Queries that only name drugs, with no infusion wording, skip straight to
//! the interaction engine.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::calculator::{CalcError, InfusionCalculator};
use crate::config::{ConfigResult, EngineConfig};
use crate::export;
use crate::extract::{self, patterns, ExtractionOutcome, Extractor, MissingField};
use crate::interactions::InteractionEngine;
use crate::models::{
    CalculationResult, DrugInteraction, InfusionRequest, QueryContext, ValidationResult,
};
use crate::registry::DrugRegistry;
use crate::validator::CalculationValidator;

/// A fully assessed infusion calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assessment {
    pub request: InfusionRequest,
    pub result: CalculationResult,
    pub validation: ValidationResult,
    /// Empty when the request has fewer than two drugs
    pub interactions: Vec<DrugInteraction>,
    /// Formatted report for display
    pub report: String,
    /// Copied from the validation; callers must check it before using the figures
    pub requires_manual_review: bool,
}

/// Interaction screening for a query without a calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionScreen {
    pub drugs: Vec<String>,
    /// Condition and species tags considered
    pub conditions: Vec<String>,
    pub interactions: Vec<DrugInteraction>,
    pub report: String,
}

/// Result of processing one query.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutcome {
    /// Required fields could not be extracted; nothing was guessed
    InsufficientInformation { missing: Vec<MissingField> },
    /// The calculation could not be performed
    Failed {
        error: CalcError,
        validation: ValidationResult,
    },
    Assessed(Assessment),
    InteractionsOnly(InteractionScreen),
}

impl EngineOutcome {
    /// Whether the outcome must go to a veterinarian before use.
    pub fn requires_manual_review(&self) -> bool {
        match self {
            EngineOutcome::InsufficientInformation { .. } | EngineOutcome::Failed { .. } => true,
            EngineOutcome::Assessed(assessment) => assessment.requires_manual_review,
            EngineOutcome::InteractionsOnly(_) => false,
        }
    }

    pub fn report(&self) -> Option<&str> {
        match self {
            EngineOutcome::Assessed(assessment) => Some(&assessment.report),
            EngineOutcome::InteractionsOnly(screen) => Some(&screen.report),
            _ => None,
        }
    }
}

/// Wires the extractor, calculator, validator and interaction engine
/// around one shared registry.
pub struct DosingEngine {
    registry: Arc<DrugRegistry>,
    config: EngineConfig,
    extractor: Extractor,
    calculator: InfusionCalculator,
    validator: CalculationValidator,
    interactions: InteractionEngine,
}

impl DosingEngine {
    pub fn new() -> Self {
        Self::build(DrugRegistry::shared(), EngineConfig::default())
    }

    /// Build with a validated configuration.
    pub fn with_config(config: EngineConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::build(DrugRegistry::shared(), config))
    }

    pub fn with_registry(registry: Arc<DrugRegistry>, config: EngineConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::build(registry, config))
    }

    fn build(registry: Arc<DrugRegistry>, config: EngineConfig) -> Self {
        Self {
            extractor: Extractor::new(&config),
            calculator: InfusionCalculator::with_config(Arc::clone(&registry), &config),
            validator: CalculationValidator::with_config(Arc::clone(&registry), &config),
            interactions: InteractionEngine::with_config(Arc::clone(&registry), &config),
            registry,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &DrugRegistry {
        &self.registry
    }

    pub fn calculator(&self) -> &InfusionCalculator {
        &self.calculator
    }

    pub fn validator(&self) -> &CalculationValidator {
        &self.validator
    }

    pub fn interaction_engine(&self) -> &InteractionEngine {
        &self.interactions
    }

    pub fn is_infusion_query(&self, text: &str) -> bool {
        extract::is_infusion_query(text)
    }

    /// Process a free-text query with optional caller context.
    pub fn process(&self, text: &str, context: &QueryContext) -> EngineOutcome {
        let merged = context
            .clone()
            .merge(extract::extract_context_with(text, &self.registry));

        let request = match &context.request {
            Some(request) => request.clone(),
            None if self.is_interaction_screen(text, &merged) => {
                return EngineOutcome::InteractionsOnly(self.screen(&merged));
            }
            None => match self.extractor.extract(text) {
                ExtractionOutcome::Complete(request) => request,
                ExtractionOutcome::Incomplete { missing } => {
                    log::info!("query is missing {} required fields", missing.len());
                    return EngineOutcome::InsufficientInformation { missing };
                }
            },
        };

        let result = match (&context.request, &context.result) {
            (Some(_), Some(result)) => result.clone(),
            _ => match self.calculator.compute(&request) {
                Ok(result) => result,
                Err(error) => {
                    log::warn!("calculation failed: {}", error);
                    let validation = self.validator.validate_calculation(&request, None);
                    return EngineOutcome::Failed { error, validation };
                }
            },
        };

        let validation = self.validator.validate_calculation(&request, Some(&result));

        let drugs = request.drug_names();
        let interactions = if drugs.len() >= 2 {
            self.interactions.interactions(&drugs, &merged.patient_tags())
        } else {
            Vec::new()
        };

        let report = export::format(Some(&result), Some(&validation), &interactions);
        let requires_manual_review = validation.requires_manual_review;
        log::info!(
            "assessed {} drugs, risk {}, manual review {}",
            drugs.len(),
            validation.risk_level,
            requires_manual_review
        );

        EngineOutcome::Assessed(Assessment {
            request,
            result,
            validation,
            interactions,
            report,
            requires_manual_review,
        })
    }

    /// Validate the calculation described by `text` and `context`.
    pub fn validate(&self, text: &str, context: &QueryContext) -> ValidationResult {
        self.validator.validate(text, context)
    }

    /// Screen `drugs` against each other and the patient `conditions`.
    pub fn check_interactions<D, C>(&self, drugs: &[D], conditions: &[C]) -> Vec<DrugInteraction>
    where
        D: AsRef<str>,
        C: AsRef<str>,
    {
        self.interactions.interactions(drugs, conditions)
    }

    fn is_interaction_screen(&self, text: &str, context: &QueryContext) -> bool {
        let calculation_wording = extract::is_infusion_query(text) || patterns::DOSE_RATE.is_match(text);
        !calculation_wording && (context.drugs.len() >= 2 || (context.interaction_query && !context.drugs.is_empty()))
    }

    fn screen(&self, context: &QueryContext) -> InteractionScreen {
        let conditions = context.patient_tags();
        let interactions = self.interactions.interactions(&context.drugs, &conditions);
        let report = export::format(None, None, &interactions);
        InteractionScreen {
            drugs: context.drugs.clone(),
            conditions,
            interactions,
            report,
        }
    }
}

impl Default for DosingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Concentration, DoseRate, FlowSpec, InfusionDrug, InteractionType, IssueKind, Partner,
        RiskLevel,
    };

    const DOPAMINE: &str = "10 kg dog, 500 mL bag at 10 mL/hour, dopamine CRI at 5 µg/kg/minute, concentration 40 mg/mL";

    fn two_drug_request() -> InfusionRequest {
        InfusionRequest::new(
            20.0,
            1000.0,
            20.0,
            vec![
                InfusionDrug::new(
                    "phenobarbital",
                    DoseRate::mg_per_kg_per_hour(0.2),
                    Concentration::mg_per_ml(65.0),
                ),
                InfusionDrug::new(
                    "diazepam",
                    DoseRate::mg_per_kg_per_hour(0.5),
                    Concentration::mg_per_ml(5.0),
                ),
            ],
        )
    }

    #[test]
    fn test_dopamine_query_assessed() {
        let outcome = DosingEngine::new().process(DOPAMINE, &QueryContext::new());
        let assessment = match outcome {
            EngineOutcome::Assessed(a) => a,
            other => panic!("expected assessment, got {:?}", other),
        };
        assert!((assessment.result.total_run_time_hours - 50.0).abs() < 1e-9);
        assert!((assessment.result.drug_volumes[0].volume_to_add_ml - 3.75).abs() < 1e-9);
        assert!(assessment.validation.is_valid);
        // dopamine is a critical drug
        assert_eq!(assessment.validation.risk_level, RiskLevel::Critical);
        assert!(assessment.requires_manual_review);
        assert!(assessment.interactions.is_empty());
        assert!(assessment.report.contains("INFUSION CALCULATION"));
        assert!(assessment.report.ends_with(export::DISCLAIMER));
    }

    #[test]
    fn test_incomplete_query_never_guesses() {
        let outcome = DosingEngine::new().process("dopamine CRI at 5 mcg/kg/min", &QueryContext::new());
        match &outcome {
            EngineOutcome::InsufficientInformation { missing } => {
                assert!(missing.contains(&MissingField::Weight))
            }
            other => panic!("expected insufficient information, got {:?}", other),
        }
        assert!(outcome.requires_manual_review());
        assert!(outcome.report().is_none());
    }

    #[test]
    fn test_context_request_runs_interactions() {
        let context = QueryContext::new().with_conditions(vec!["liver_disease".into()]);
        let context = QueryContext {
            request: Some(two_drug_request()),
            ..context
        };
        let outcome = DosingEngine::new().process("check this infusion", &context);
        let assessment = match outcome {
            EngineOutcome::Assessed(a) => a,
            other => panic!("expected assessment, got {:?}", other),
        };
        assert!(assessment
            .interactions
            .iter()
            .any(|i| i.interaction_type == InteractionType::EnzymeInduction));
        assert!(assessment
            .report
            .contains("PHARMACOLOGICAL INTERACTION ANALYSIS"));
    }

    #[test]
    fn test_zero_flow_fails_with_validation() {
        let mut request = two_drug_request();
        request.flow = FlowSpec::Rate { ml_per_hour: 0.0 };
        let context = QueryContext {
            request: Some(request),
            ..QueryContext::default()
        };
        match DosingEngine::new().process("", &context) {
            EngineOutcome::Failed { error, validation } => {
                assert!(matches!(error, CalcError::DivisionByZero { .. }));
                assert!(!validation.is_valid);
                assert!(validation.has_issue(IssueKind::DivisionByZero));
                assert!(validation.requires_manual_review);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_interaction_only_query() {
        let outcome = DosingEngine::new().process(
            "Can I give Rimadyl together with phenobarb to a 12 kg cat with liver disease?",
            &QueryContext::new(),
        );
        let screen = match outcome {
            EngineOutcome::InteractionsOnly(screen) => screen,
            other => panic!("expected interaction screen, got {:?}", other),
        };
        assert_eq!(screen.drugs, vec!["carprofen", "phenobarbital"]);
        assert!(screen.conditions.contains(&"feline".to_string()));
        assert!(screen
            .interactions
            .iter()
            .any(|i| i.drug == "carprofen" && i.partner == Partner::Condition("feline".into())));
        assert!(!screen.report.contains("INFUSION CALCULATION"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            relative_tolerance: 0.0,
            ..EngineConfig::default()
        };
        assert!(DosingEngine::with_config(config).is_err());
    }
}
