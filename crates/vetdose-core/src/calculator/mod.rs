//! Constant-rate-infusion calculator.
//!
//! Pipeline: Flow derivation → Run time → Per-drug dose integration →
//! Totals → Displacement check.
//!
//! The dose is integrated over the whole run time, never just one hour:
//! `volume = dose_mg_per_kg_per_hour × weight × total_hours / concentration`.

use std::sync::Arc;

use thiserror::Error;

use crate::config::EngineConfig;
use crate::models::{
    CalculationResult, ConcentrationUnit, DrugVolume, FlowSpec, InfusionDrug, InfusionRequest,
    IssueKind, StepTrace,
};
use crate::registry::DrugRegistry;

/// Calculation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("Division by zero: {quantity} is {value}")]
    DivisionByZero { quantity: String, value: f64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CalcError {
    /// Safety-issue kind this error maps to.
    pub fn issue_kind(&self) -> IssueKind {
        match self {
            CalcError::DivisionByZero { .. } => IssueKind::DivisionByZero,
            CalcError::InvalidInput(_) => IssueKind::Incomplete,
        }
    }
}

pub type CalcResult<T> = Result<T, CalcError>;

fn require_positive(quantity: &str, value: f64) -> CalcResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(CalcError::InvalidInput(format!(
            "{} must be a positive number, got {}",
            quantity, value
        )))
    }
}

/// Divisor check: non-finite is invalid input, zero or negative is a division by zero.
/// Non-finite values are invalid input; zero or negative values are division by zero.
pub(crate) fn require_divisor(quantity: &str, value: f64) -> CalcResult<f64> {
    if !value.is_finite() {
        return Err(CalcError::InvalidInput(format!("{} is not finite", quantity)));
    }
    if value <= 0.0 {
        return Err(CalcError::DivisionByZero {
            quantity: quantity.to_string(),
            value,
        });
    }
    Ok(value)
}

/// Computes run time and per-drug volumes with a replayable step trace.
pub struct InfusionCalculator {
    registry: Arc<DrugRegistry>,
    displacement_warning_fraction: f64,
}

impl InfusionCalculator {
    pub fn new(registry: Arc<DrugRegistry>) -> Self {
        Self::with_config(registry, &EngineConfig::default())
    }

    pub fn with_config(registry: Arc<DrugRegistry>, config: &EngineConfig) -> Self {
        Self {
            registry,
            displacement_warning_fraction: config.displacement_warning_fraction,
        }
    }

    pub fn compute(&self, request: &InfusionRequest) -> CalcResult<CalculationResult> {
        let weight = require_positive("weight_kg", request.weight_kg)?;
        let bag = require_positive("bag_volume_ml", request.bag_volume_ml)?;
        if request.drugs.is_empty() {
            return Err(CalcError::InvalidInput("no drugs in request".into()));
        }

        log::info!("computing CRI for {} drugs", request.drugs.len());
        let mut trace = StepTrace::new();

        let flow = self.derive_flow(&request.flow, weight, bag, &mut trace)?;
        let total_hours = trace.record(
            "Calculate total bag run time",
            "Total hours = Bag volume (mL) / Flow rate (mL/hr)",
            &[("bag_volume_ml", bag), ("flow_rate_ml_per_hour", flow)],
            bag / flow,
            "hours",
        );

        let drug_volumes = request
            .drugs
            .iter()
            .map(|drug| self.drug_volume(drug, weight, total_hours, &mut trace))
            .collect::<CalcResult<Vec<_>>>()?;

        let volumes: Vec<(String, f64)> = drug_volumes
            .iter()
            .map(|d| (format!("{}_volume_ml", d.drug), d.volume_to_add_ml))
            .collect();
        let inputs: Vec<(&str, f64)> = volumes.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        let total_drug_volume = trace.record(
            "Sum drug volumes",
            "Total drug volume (mL) = sum of drug volumes (mL)",
            &inputs,
            drug_volumes.iter().map(|d| d.volume_to_add_ml).sum(),
            "mL",
        );

        let final_bag_volume = trace.record(
            "Calculate final bag volume",
            "Final volume (mL) = Bag volume (mL) + Total drug volume (mL)",
            &[("bag_volume_ml", bag), ("total_drug_volume_ml", total_drug_volume)],
            bag + total_drug_volume,
            "mL",
        );

        let mut warnings = Vec::new();
        let displacement = total_drug_volume / bag;
        if displacement > self.displacement_warning_fraction {
            log::warn!("drug volume displaces {:.1}% of bag", displacement * 100.0);
            warnings.push(format!(
                "High volume displacement: {:.1}% of bag volume",
                displacement * 100.0
            ));
        }
        if request.is_heuristic() {
            let fields: Vec<String> = request
                .provenance
                .substituted()
                .iter()
                .map(|f| f.to_string())
                .collect();
            warnings.push(format!(
                "Heuristic estimate: assumed {}",
                fields.join(", ")
            ));
        }

        log::debug!("calculation recorded {} steps", trace.len());

        Ok(CalculationResult {
            total_run_time_hours: total_hours,
            flow_rate_ml_per_hour: flow,
            drug_volumes,
            total_drug_volume_ml: total_drug_volume,
            final_bag_volume_ml: final_bag_volume,
            steps: trace.into_steps(),
            warnings,
            is_valid: true,
            provenance: request.provenance.clone(),
        })
    }

    /// Flow rate in mL/hour from the request's flow specification.
    fn derive_flow(&self, flow: &FlowSpec, weight: f64, bag: f64, trace: &mut StepTrace) -> CalcResult<f64> {
        let flow = match *flow {
            FlowSpec::Rate { ml_per_hour } => ml_per_hour,
            FlowSpec::Duration { hours } => {
                let hours = require_divisor("duration_hours", hours)?;
                trace.record(
                    "Derive flow rate from run duration",
                    "Flow rate (mL/hr) = Bag volume (mL) / Duration (hr)",
                    &[("bag_volume_ml", bag), ("duration_hours", hours)],
                    bag / hours,
                    "mL/hr",
                )
            }
            FlowSpec::Maintenance { ml_per_kg_per_hour } => trace.record(
                "Derive flow rate from maintenance fluid rate",
                "Flow rate (mL/hr) = Maintenance rate (mL/kg/hr) × Weight (kg)",
                &[("maintenance_ml_per_kg_per_hour", ml_per_kg_per_hour), ("weight_kg", weight)],
                ml_per_kg_per_hour * weight,
                "mL/hr",
            ),
        };
        require_divisor("flow_rate_ml_per_hour", flow)
    }

    fn drug_volume(
        &self,
        drug: &InfusionDrug,
        weight: f64,
        total_hours: f64,
        trace: &mut StepTrace,
    ) -> CalcResult<DrugVolume> {
        let canonical = self.registry.canonical_name(&drug.name);
        let key = if canonical.is_empty() { drug.name.clone() } else { canonical };

        let stated_dose = drug.dose.value;
        if !(stated_dose.is_finite() && stated_dose > 0.0) {
            return Err(CalcError::InvalidInput(format!(
                "{} dose must be a positive number, got {}",
                drug.name, stated_dose
            )));
        }
        let dose = if drug.dose.unit.is_canonical() {
            stated_dose
        } else {
            trace.record(
                format!("Convert {} dose to mg/kg/hr", drug.name),
                format!("Dose (mg/kg/hr) = Dose ({}) converted", drug.dose.unit.label()),
                &[("dose", stated_dose)],
                drug.dose.to_mg_per_kg_per_hour(),
                "mg/kg/hr",
            )
        };

        let stated_conc = drug.concentration.value;
        require_positive(&format!("{} concentration", drug.name), stated_conc)?;
        let concentration = if drug.concentration.unit == ConcentrationUnit::MgPerMl {
            stated_conc
        } else {
            trace.record(
                format!("Convert {} concentration to mg/mL", drug.name),
                format!(
                    "Concentration (mg/mL) = Concentration ({}) converted",
                    drug.concentration.unit.label()
                ),
                &[("concentration", stated_conc)],
                drug.concentration.to_mg_per_ml(),
                "mg/mL",
            )
        };
        let concentration = require_divisor(&format!("{} concentration", drug.name), concentration)?;

        let hourly = trace.record(
            format!("Calculate {} hourly dose", drug.name),
            "Hourly dose (mg/hr) = Dose (mg/kg/hr) × Weight (kg)",
            &[("dose_mg_per_kg_per_hour", dose), ("weight_kg", weight)],
            dose * weight,
            "mg/hr",
        );
        let total = trace.record(
            format!("Calculate {} total dose for the run", drug.name),
            "Total dose (mg) = Hourly dose (mg/hr) × Total hours",
            &[("hourly_dose_mg", hourly), ("total_hours", total_hours)],
            hourly * total_hours,
            "mg",
        );
        let volume = trace.record(
            format!("Calculate {} volume to add", drug.name),
            "Volume (mL) = Total dose (mg) / Concentration (mg/mL)",
            &[("total_dose_mg", total), ("concentration_mg_per_ml", concentration)],
            total / concentration,
            "mL",
        );

        Ok(DrugVolume {
            drug: key,
            display_name: drug.name.clone(),
            dose_mg_per_kg_per_hour: dose,
            hourly_dose_mg: hourly,
            total_dose_mg: total,
            concentration_mg_per_ml: concentration,
            volume_to_add_ml: volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Concentration, DoseRate, DoseUnit, Provenance, RequestField};
    use approx::assert_abs_diff_eq;

    fn calculator() -> InfusionCalculator {
        InfusionCalculator::new(DrugRegistry::shared())
    }

    fn dopamine() -> InfusionDrug {
        InfusionDrug::new(
            "Dopamine",
            DoseRate::new(5.0, DoseUnit::McgPerKgPerMinute),
            Concentration::mg_per_ml(40.0),
        )
    }

    #[test]
    fn test_dopamine_worked_example() {
        let request = InfusionRequest::new(10.0, 500.0, 10.0, vec![dopamine()]);
        let result = calculator().compute(&request).unwrap();

        assert_eq!(result.total_run_time_hours, 50.0);
        let volume = &result.drug_volumes[0];
        assert_eq!(volume.drug, "dopamine");
        assert_eq!(volume.display_name, "Dopamine");
        assert_abs_diff_eq!(volume.dose_mg_per_kg_per_hour, 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(volume.hourly_dose_mg, 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(volume.total_dose_mg, 150.0, epsilon = 1e-9);
        assert_abs_diff_eq!(volume.volume_to_add_ml, 3.75, epsilon = 1e-9);
        assert_abs_diff_eq!(result.final_bag_volume_ml, 503.75, epsilon = 1e-9);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_steps_are_ordered_and_replayable() {
        let request = InfusionRequest::new(10.0, 500.0, 10.0, vec![dopamine()]);
        let result = calculator().compute(&request).unwrap();

        for (i, step) in result.steps.iter().enumerate() {
            assert_eq!(step.ordinal as usize, i + 1);
        }
        assert_eq!(result.steps[0].description, "Calculate total bag run time");
        assert_eq!(result.steps[0].inputs["bag_volume_ml"], 500.0);
        // run time, dose conversion, hourly, total, volume, sum, final
        assert_eq!(result.steps.len(), 7);
    }

    #[test]
    fn test_zero_and_negative_flow() {
        for rate in [0.0, -5.0] {
            let request = InfusionRequest::new(10.0, 500.0, rate, vec![dopamine()]);
            let err = calculator().compute(&request).unwrap_err();
            assert!(matches!(err, CalcError::DivisionByZero { .. }));
            assert_eq!(err.issue_kind(), IssueKind::DivisionByZero);
        }

        let request = InfusionRequest::with_flow(10.0, 500.0, FlowSpec::Duration { hours: 0.0 }, vec![dopamine()]);
        assert!(matches!(
            calculator().compute(&request),
            Err(CalcError::DivisionByZero { ref quantity, .. }) if quantity == "duration_hours"
        ));
    }

    #[test]
    fn test_invalid_inputs() {
        let request = InfusionRequest::new(0.0, 500.0, 10.0, vec![dopamine()]);
        assert!(matches!(calculator().compute(&request), Err(CalcError::InvalidInput(_))));

        let request = InfusionRequest::new(10.0, 500.0, 10.0, vec![]);
        assert!(matches!(calculator().compute(&request), Err(CalcError::InvalidInput(_))));

        let mut drug = dopamine();
        drug.concentration = Concentration::mg_per_ml(0.0);
        let request = InfusionRequest::new(10.0, 500.0, 10.0, vec![drug]);
        assert!(matches!(calculator().compute(&request), Err(CalcError::InvalidInput(_))));

        let request = InfusionRequest::new(10.0, 500.0, f64::NAN, vec![dopamine()]);
        assert!(matches!(calculator().compute(&request), Err(CalcError::InvalidInput(_))));
    }

    #[test]
    fn test_duration_and_maintenance_flow() {
        let request = InfusionRequest::with_flow(10.0, 500.0, FlowSpec::Duration { hours: 25.0 }, vec![dopamine()]);
        let result = calculator().compute(&request).unwrap();
        assert_abs_diff_eq!(result.flow_rate_ml_per_hour, 20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.total_run_time_hours, 25.0, epsilon = 1e-12);
        assert_eq!(result.steps[0].description, "Derive flow rate from run duration");

        let request = InfusionRequest::with_flow(
            10.0,
            600.0,
            FlowSpec::Maintenance { ml_per_kg_per_hour: 3.0 },
            vec![dopamine()],
        );
        let result = calculator().compute(&request).unwrap();
        assert_abs_diff_eq!(result.flow_rate_ml_per_hour, 30.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result.total_run_time_hours, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_displacement_warning() {
        // 100 mg/kg/hr ketamine at 100 mg/mL for 20 kg over 50 h: 1000 mL into a 500 mL bag
        let drug = InfusionDrug::new(
            "ketamine",
            DoseRate::mg_per_kg_per_hour(100.0),
            Concentration::mg_per_ml(100.0),
        );
        let request = InfusionRequest::new(20.0, 500.0, 10.0, vec![drug]);
        let result = calculator().compute(&request).unwrap();
        assert!(result.warnings[0].starts_with("High volume displacement"));
        assert!(result.displacement_fraction() > 0.2);
    }

    #[test]
    fn test_percent_concentration_and_aliases() {
        let drug = InfusionDrug::new(
            "Xylocaine",
            DoseRate::mg_per_kg_per_hour(2.0),
            Concentration::new(2.0, ConcentrationUnit::Percent),
        );
        let request = InfusionRequest::new(10.0, 500.0, 10.0, vec![drug]);
        let result = calculator().compute(&request).unwrap();
        assert_eq!(result.drug_volumes[0].drug, "lidocaine");
        assert_eq!(result.drug_volumes[0].concentration_mg_per_ml, 20.0);
        assert_abs_diff_eq!(result.drug_volumes[0].volume_to_add_ml, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_provenance_copied() {
        let provenance = Provenance::Heuristic {
            substituted: vec![RequestField::Weight],
        };
        let request = InfusionRequest::new(25.0, 500.0, 10.0, vec![dopamine()]).with_provenance(provenance.clone());
        let result = calculator().compute(&request).unwrap();
        assert_eq!(result.provenance, provenance);
        assert!(result.warnings.iter().any(|w| w.contains("patient weight")));
    }
}
