//! Plain-text report rendering.
//!
//! Pure formatting only. Nothing here computes, validates or timestamps.

use crate::models::{CalculationResult, DrugInteraction, Severity, ValidationResult};

/// Appended to every report.
pub const DISCLAIMER: &str = "DISCLAIMER: This output is clinical decision support only. \
Every dose, volume and interaction must be verified by a veterinarian before administration.";

pub const NO_INTERACTIONS: &str =
    "No significant drug interactions detected based on pharmacological mechanisms.";

/// Render a calculation, its validation and any interactions as one report.
pub fn format(
    result: Option<&CalculationResult>,
    validation: Option<&ValidationResult>,
    interactions: &[DrugInteraction],
) -> String {
    let mut sections = Vec::new();

    if validation.map_or(false, |v| v.requires_manual_review) {
        sections.push(
            "*** MANUAL REVIEW REQUIRED ***\nDo not use the figures below until a veterinarian has verified them."
                .to_string(),
        );
    }
    if let Some(result) = result {
        sections.push(format_calculation(result));
    }
    if let Some(validation) = validation {
        sections.push(format_validation(validation));
    }
    sections.push(format_interactions(interactions));
    sections.push(DISCLAIMER.to_string());

    sections.join("\n\n")
}

pub fn format_calculation(result: &CalculationResult) -> String {
    let mut out = String::from("INFUSION CALCULATION\n");
    out.push_str(&format!(
        "Total run time: {:.2} hours at {:.2} mL/hr\n",
        result.total_run_time_hours, result.flow_rate_ml_per_hour
    ));
    out.push_str("Drug volumes:\n");
    for dv in &result.drug_volumes {
        out.push_str(&format!(
            "  - {}: add {:.3} mL ({:.4} mg/kg/hr, {:.3} mg total at {:.3} mg/mL)\n",
            dv.display_name,
            dv.volume_to_add_ml,
            dv.dose_mg_per_kg_per_hour,
            dv.total_dose_mg,
            dv.concentration_mg_per_ml
        ));
    }
    out.push_str(&format!("Total drug volume: {:.3} mL\n", result.total_drug_volume_ml));
    out.push_str(&format!("Final bag volume: {:.3} mL\n", result.final_bag_volume_ml));
    for warning in &result.warnings {
        out.push_str(&format!("Warning: {}\n", warning));
    }

    out.push_str("\nCALCULATION STEPS\n");
    for step in &result.steps {
        out.push_str(&format!(
            "  {}. {}\n     {} = {} {}\n",
            step.ordinal,
            step.description,
            step.formula,
            trim_float(step.result),
            step.unit
        ));
    }
    out.trim_end().to_string()
}

pub fn format_validation(validation: &ValidationResult) -> String {
    let mut out = String::from("VALIDATION\n");
    out.push_str(&format!(
        "Status: {}\n",
        if validation.is_valid { "VALID" } else { "INVALID" }
    ));
    out.push_str(&format!(
        "Risk level: {}\n",
        validation.risk_level.label().to_uppercase()
    ));
    out.push_str(&format!("Confidence: {:.0}%\n", validation.confidence * 100.0));
    out.push_str(&format!(
        "Manual review: {}\n",
        if validation.requires_manual_review { "REQUIRED" } else { "not required" }
    ));
    for error in &validation.errors {
        out.push_str(&format!("Error: {}\n", error));
    }
    for warning in &validation.warnings {
        out.push_str(&format!("Warning: {}\n", warning));
    }
    out.trim_end().to_string()
}

/// Interactions grouped by severity, most severe first.
pub fn format_interactions(interactions: &[DrugInteraction]) -> String {
    let mut out = String::from("PHARMACOLOGICAL INTERACTION ANALYSIS\n");
    if interactions.is_empty() {
        out.push_str(NO_INTERACTIONS);
        return out;
    }

    for severity in Severity::DESCENDING {
        let group: Vec<&DrugInteraction> = interactions
            .iter()
            .filter(|i| i.severity == severity)
            .collect();
        if group.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{} ({})\n", severity.label().to_uppercase(), group.len()));
        for interaction in group {
            out.push_str(&format!(
                "  * {} + {}\n    Mechanism: {}\n    Clinical Effect: {}\n    Management: {}\n    Confidence: {:.0}%\n",
                interaction.drug,
                interaction.partner,
                interaction.mechanism,
                interaction.clinical_effect,
                interaction.management,
                interaction.confidence * 100.0
            ));
        }
    }
    out.trim_end().to_string()
}

fn trim_float(value: f64) -> String {
    let text = format!("{:.4}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::InteractionEngine;
    use crate::models::{CalculationType, RiskLevel};
    use crate::registry::DrugRegistry;

    #[test]
    fn test_empty_interactions() {
        let report = format(None, None, &[]);
        assert!(report.contains(NO_INTERACTIONS));
        assert!(report.ends_with(DISCLAIMER));
    }

    #[test]
    fn test_groups_in_severity_order() {
        let engine = InteractionEngine::new(DrugRegistry::shared());
        let interactions = engine.interactions(&["phenobarbital", "diazepam"], &["liver disease"]);
        let text = format_interactions(&interactions);

        assert!(text.starts_with("PHARMACOLOGICAL INTERACTION ANALYSIS\n\nCONTRAINDICATED"));
        assert!(text.contains("phenobarbital + diazepam") || text.contains("diazepam + phenobarbital"));
        assert!(text.contains("Confidence: 90%"));
        assert!(!text.contains(NO_INTERACTIONS));
    }

    #[test]
    fn test_full_report_sections() {
        let engine = InteractionEngine::new(DrugRegistry::shared());
        let interactions = engine.interactions(&["phenobarbital", "diazepam"], &["liver disease"]);
        let validation = ValidationResult {
            is_valid: false,
            confidence: 0.0,
            risk_level: RiskLevel::Critical,
            errors: vec!["Missing parameter: patient weight".into()],
            warnings: Vec::new(),
            issues: Vec::new(),
            calculation_steps: Vec::new(),
            verification_methods: Vec::new(),
            requires_manual_review: true,
            calculation_type: CalculationType::CriCalculation,
        };
        let report = format(None, Some(&validation), &interactions);
        assert!(report.starts_with("*** MANUAL REVIEW REQUIRED ***"));
        assert!(report.contains("Manual review: REQUIRED"));
        assert!(report.contains("Risk level: CRITICAL"));
        assert!(report.contains("Error: Missing parameter: patient weight"));
        assert!(report.ends_with(DISCLAIMER));
    }

    #[test]
    fn test_trim_float() {
        assert_eq!(trim_float(50.0), "50");
        assert_eq!(trim_float(3.75), "3.75");
        assert_eq!(trim_float(0.3), "0.3");
    }
}
