//! Calculation result and audit-trail models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::infusion::Provenance;

/// One arithmetic step of a calculation, with enough detail to replay it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationStep {
    /// 1-based position in the trace
    pub ordinal: u32,
    /// Human-readable description
    pub description: String,
    /// Formula as applied (e.g. "bag_volume_ml / flow_rate_ml_per_hour")
    pub formula: String,
    /// Named operands
    pub inputs: BTreeMap<String, f64>,
    /// Numeric result
    pub result: f64,
    /// Unit of the result
    pub unit: String,
}

/// Append-only step trace for a single calculation pass.
#[derive(Debug, Clone, Default)]
pub struct StepTrace {
    steps: Vec<CalculationStep>,
}

impl StepTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step and return its result, so arithmetic can be written inline.
    pub fn record(
        &mut self,
        description: impl Into<String>,
        formula: impl Into<String>,
        inputs: &[(&str, f64)],
        result: f64,
        unit: &str,
    ) -> f64 {
        self.steps.push(CalculationStep {
            ordinal: self.steps.len() as u32 + 1,
            description: description.into(),
            formula: formula.into(),
            inputs: inputs
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
            result,
            unit: unit.to_string(),
        });
        result
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[CalculationStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<CalculationStep> {
        self.steps
    }
}

/// Computed figures for a single drug in the bag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugVolume {
    /// Canonical drug name (registry key)
    pub drug: String,
    /// Name as it appeared in the request
    pub display_name: String,
    /// Dose normalized to mg/kg/hour
    pub dose_mg_per_kg_per_hour: f64,
    /// mg delivered per hour
    pub hourly_dose_mg: f64,
    /// mg delivered over the whole run
    pub total_dose_mg: f64,
    /// Stock concentration normalized to mg/mL
    pub concentration_mg_per_ml: f64,
    /// Stock volume to add to the bag
    pub volume_to_add_ml: f64,
}

/// Result of an infusion calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalculationResult {
    /// Bag volume / flow rate
    pub total_run_time_hours: f64,
    /// Effective flow rate used (stated or derived)
    pub flow_rate_ml_per_hour: f64,
    /// Per-drug figures, in request order
    pub drug_volumes: Vec<DrugVolume>,
    /// Sum of all drug volumes
    pub total_drug_volume_ml: f64,
    /// Bag volume plus drug volume
    pub final_bag_volume_ml: f64,
    /// Audit trail
    pub steps: Vec<CalculationStep>,
    /// Non-fatal findings (e.g. volume displacement)
    pub warnings: Vec<String>,
    /// Whether the calculation completed
    pub is_valid: bool,
    /// Copied from the request so estimates stay visible
    #[serde(default)]
    pub provenance: Provenance,
}

impl CalculationResult {
    /// Volume to add for a drug, looked up by canonical or display name.
    pub fn volume_for(&self, drug: &str) -> Option<f64> {
        let lower = drug.to_lowercase();
        self.drug_volumes
            .iter()
            .find(|v| v.drug == lower || v.display_name.to_lowercase() == lower)
            .map(|v| v.volume_to_add_ml)
    }

    /// Per-drug volumes keyed by canonical name.
    pub fn volumes_by_drug(&self) -> BTreeMap<String, f64> {
        self.drug_volumes
            .iter()
            .map(|v| (v.drug.clone(), v.volume_to_add_ml))
            .collect()
    }

    /// Drug volume as a fraction of the bag volume.
    pub fn displacement_fraction(&self) -> f64 {
        let bag = self.final_bag_volume_ml - self.total_drug_volume_ml;
        if bag > 0.0 {
            self.total_drug_volume_ml / bag
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_is_ordinal() {
        let mut trace = StepTrace::new();
        let hours = trace.record("Run time", "bag / flow", &[("bag", 500.0), ("flow", 10.0)], 50.0, "hours");
        trace.record("Double", "hours * 2", &[("hours", hours)], hours * 2.0, "hours");

        assert_eq!(hours, 50.0);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.steps()[0].ordinal, 1);
        assert_eq!(trace.steps()[1].ordinal, 2);
        assert_eq!(trace.steps()[0].inputs.get("flow"), Some(&10.0));
    }

    #[test]
    fn test_volume_lookup() {
        let result = CalculationResult {
            total_run_time_hours: 50.0,
            flow_rate_ml_per_hour: 10.0,
            drug_volumes: vec![DrugVolume {
                drug: "dopamine".into(),
                display_name: "Dopamine".into(),
                dose_mg_per_kg_per_hour: 0.3,
                hourly_dose_mg: 3.0,
                total_dose_mg: 150.0,
                concentration_mg_per_ml: 40.0,
                volume_to_add_ml: 3.75,
            }],
            total_drug_volume_ml: 3.75,
            final_bag_volume_ml: 503.75,
            steps: vec![],
            warnings: vec![],
            is_valid: true,
            provenance: Provenance::Parsed,
        };

        assert_eq!(result.volume_for("Dopamine"), Some(3.75));
        assert_eq!(result.volume_for("dopamine"), Some(3.75));
        assert_eq!(result.volume_for("lidocaine"), None);
        assert_eq!(result.volumes_by_drug().len(), 1);
        assert!((result.displacement_fraction() - 0.0075).abs() < 1e-12);
    }
}
