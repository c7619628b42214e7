//! Independent re-derivation of an infusion calculation.
//!
//! This path does not share arithmetic with the calculator: units are
//! converted with its own factor tables and each volume is computed in one
//! expression, `(dose × weight × hours) / concentration`. Input guards are
//! shared so both paths classify bad flow the same way.

use serde::{Deserialize, Serialize};

use crate::calculator::{require_divisor, CalcError, CalcResult};
use crate::models::{
    CalculationResult, ConcentrationUnit, DoseUnit, FlowSpec, InfusionDrug, InfusionRequest, StepTrace,
};

/// A quantity on which the two derivations disagree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Discrepancy {
    pub quantity: String,
    pub expected: f64,
    /// `None` when the result has no value for the quantity at all
    pub actual: Option<f64>,
    pub relative_error: f64,
}

impl Discrepancy {
    pub fn describe(&self) -> String {
        match self.actual {
            Some(actual) => format!(
                "Calculation discrepancy in {}: expected {:.4}, got {:.4} ({:.1}% difference)",
                self.quantity,
                self.expected,
                actual,
                self.relative_error * 100.0
            ),
            None => format!(
                "Calculation discrepancy in {}: expected {:.4}, missing from result",
                self.quantity, self.expected
            ),
        }
    }
}

/// Independently derived figures.
#[derive(Debug, Clone, PartialEq)]
pub struct Rederived {
    pub flow_rate_ml_per_hour: f64,
    pub total_hours: f64,
    /// (stated drug name, mg/kg/hr, volume mL) in request order
    pub drugs: Vec<(String, f64, f64)>,
    pub total_drug_volume_ml: f64,
    pub final_bag_volume_ml: f64,
}

fn dose_factor(unit: DoseUnit) -> f64 {
    let (mass, time) = match unit {
        DoseUnit::MgPerKgPerHour => (1.0, 1.0),
        DoseUnit::McgPerKgPerHour => (0.001, 1.0),
        DoseUnit::MgPerKgPerMinute => (1.0, 60.0),
        DoseUnit::McgPerKgPerMinute => (0.001, 60.0),
    };
    mass * time
}

fn concentration_factor(unit: ConcentrationUnit) -> f64 {
    match unit {
        ConcentrationUnit::MgPerMl => 1.0,
        ConcentrationUnit::McgPerMl => 0.001,
        ConcentrationUnit::Percent => 10.0,
    }
}

pub fn relative_error(expected: f64, actual: f64) -> f64 {
    let diff = (actual - expected).abs();
    if expected.abs() < 1e-12 {
        diff
    } else {
        diff / expected.abs()
    }
}

/// Re-derive run time and volumes, recording steps into `trace`.
pub fn rederive(request: &InfusionRequest, trace: &mut StepTrace) -> CalcResult<Rederived> {
    let bag = request.bag_volume_ml;
    let weight = request.weight_kg;

    let flow = match request.flow {
        FlowSpec::Rate { ml_per_hour } => ml_per_hour,
        FlowSpec::Duration { hours } => bag / require_divisor("duration_hours", hours)?,
        FlowSpec::Maintenance { ml_per_kg_per_hour } => weight * ml_per_kg_per_hour,
    };
    let flow = require_divisor("flow_rate_ml_per_hour", flow)?;

    let hours = trace.record(
        "Verify run time",
        "hours = bag_volume_ml / flow_rate_ml_per_hour",
        &[("bag_volume_ml", bag), ("flow_rate_ml_per_hour", flow)],
        bag / flow,
        "hours",
    );

    let mut drugs = Vec::with_capacity(request.drugs.len());
    for drug in &request.drugs {
        drugs.push(rederive_drug(drug, weight, hours, trace)?);
    }

    let total: f64 = drugs.iter().map(|(_, _, v)| v).sum();
    let total = trace.record(
        "Verify total drug volume",
        "total = Σ volume_ml",
        &[("drug_count", drugs.len() as f64)],
        total,
        "mL",
    );

    Ok(Rederived {
        flow_rate_ml_per_hour: flow,
        total_hours: hours,
        drugs,
        total_drug_volume_ml: total,
        final_bag_volume_ml: bag + total,
    })
}

fn rederive_drug(
    drug: &InfusionDrug,
    weight: f64,
    hours: f64,
    trace: &mut StepTrace,
) -> CalcResult<(String, f64, f64)> {
    let dose = drug.dose.value * dose_factor(drug.dose.unit);
    let concentration = drug.concentration.value * concentration_factor(drug.concentration.unit);
    if !(concentration > 0.0) {
        return Err(CalcError::InvalidInput(format!(
            "{} concentration must be positive",
            drug.name
        )));
    }
    let volume = trace.record(
        format!("Verify {} volume", drug.name),
        "volume_ml = (dose_mg_per_kg_per_hour × weight_kg × hours) / concentration_mg_per_ml",
        &[
            ("dose_mg_per_kg_per_hour", dose),
            ("weight_kg", weight),
            ("hours", hours),
            ("concentration_mg_per_ml", concentration),
        ],
        (dose * weight * hours) / concentration,
        "mL",
    );
    Ok((drug.name.clone(), dose, volume))
}

/// Compare a re-derivation against a result.
pub fn compare(rederived: &Rederived, result: &CalculationResult, tolerance: f64) -> Vec<Discrepancy> {
    let mut found = Vec::new();
    let mut check = |quantity: String, expected: f64, actual: f64| {
        let error = relative_error(expected, actual);
        // NaN never passes
        if !(error <= tolerance) {
            found.push(Discrepancy {
                quantity,
                expected,
                actual: Some(actual),
                relative_error: error,
            });
        }
    };

    check("run time".into(), rederived.total_hours, result.total_run_time_hours);

    let mut matched = vec![false; result.drug_volumes.len()];
    let mut missing = Vec::new();
    for (name, _, volume) in &rederived.drugs {
        let position = result.drug_volumes.iter().enumerate().position(|(i, dv)| {
            !matched[i] && (dv.display_name == *name || dv.drug.eq_ignore_ascii_case(name))
        });
        match position {
            Some(i) => {
                matched[i] = true;
                check(
                    format!("{} volume", name),
                    *volume,
                    result.drug_volumes[i].volume_to_add_ml,
                );
            }
            None => missing.push(Discrepancy {
                quantity: format!("{} volume", name),
                expected: *volume,
                actual: None,
                relative_error: 1.0,
            }),
        }
    }

    check(
        "total drug volume".into(),
        rederived.total_drug_volume_ml,
        result.total_drug_volume_ml,
    );
    check(
        "final bag volume".into(),
        rederived.final_bag_volume_ml,
        result.final_bag_volume_ml,
    );

    found.extend(missing);
    for (i, dv) in result.drug_volumes.iter().enumerate() {
        if !matched[i] {
            found.push(Discrepancy {
                quantity: format!("{} volume (not in request)", dv.display_name),
                expected: 0.0,
                actual: Some(dv.volume_to_add_ml),
                relative_error: 1.0,
            });
        }
    }
    found
}

/// Every discrepancy between `result` and an independent re-derivation of `request`.
pub fn cross_check(
    request: &InfusionRequest,
    result: &CalculationResult,
    tolerance: f64,
) -> CalcResult<Vec<Discrepancy>> {
    let mut trace = StepTrace::new();
    let rederived = rederive(request, &mut trace)?;
    Ok(compare(&rederived, result, tolerance))
}
