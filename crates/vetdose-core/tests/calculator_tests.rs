//! Integration tests for the infusion calculator.

use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use vetdose_core::calculator::{CalcError, InfusionCalculator};
use vetdose_core::models::{Concentration, DoseRate, DoseUnit, FlowSpec, InfusionDrug, InfusionRequest};
use vetdose_core::registry::DrugRegistry;

fn calculator() -> InfusionCalculator {
    InfusionCalculator::new(DrugRegistry::shared())
}

fn single_drug(weight: f64, bag: f64, flow: f64, dose: f64, conc: f64) -> InfusionRequest {
    InfusionRequest::new(
        weight,
        bag,
        flow,
        vec![InfusionDrug::new(
            "lidocaine",
            DoseRate::mg_per_kg_per_hour(dose),
            Concentration::mg_per_ml(conc),
        )],
    )
}

#[test]
fn test_dopamine_reference_case() {
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
    let result = calculator().compute(&request).unwrap();

    assert_abs_diff_eq!(result.total_run_time_hours, 50.0, epsilon = 1e-9);
    let dopamine = &result.drug_volumes[0];
    assert_eq!(dopamine.drug, "dopamine");
    assert_eq!(dopamine.display_name, "Dopamine");
    assert_abs_diff_eq!(dopamine.dose_mg_per_kg_per_hour, 0.3, epsilon = 1e-9);
    assert_abs_diff_eq!(dopamine.hourly_dose_mg, 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(dopamine.total_dose_mg, 150.0, epsilon = 1e-9);
    assert_abs_diff_eq!(dopamine.volume_to_add_ml, 3.75, epsilon = 1e-9);
    assert_abs_diff_eq!(result.final_bag_volume_ml, 503.75, epsilon = 1e-9);
    assert!(result.is_valid);
}

/// The volume must cover the whole run, not a single hour.
#[test]
fn test_volume_integrates_over_total_duration() {
    let result = calculator().compute(&single_drug(20.0, 1000.0, 20.0, 2.0, 20.0)).unwrap();
    let lidocaine = &result.drug_volumes[0];

    let one_hour_volume = lidocaine.hourly_dose_mg / lidocaine.concentration_mg_per_ml;
    assert_abs_diff_eq!(one_hour_volume, 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(lidocaine.volume_to_add_ml, 100.0, epsilon = 1e-9);
    assert_abs_diff_eq!(
        lidocaine.volume_to_add_ml,
        one_hour_volume * result.total_run_time_hours,
        epsilon = 1e-9
    );
}

#[test]
fn test_step_trace_is_ordered() {
    let result = calculator().compute(&single_drug(20.0, 1000.0, 20.0, 2.0, 20.0)).unwrap();
    let ordinals: Vec<u32> = result.steps.iter().map(|s| s.ordinal).collect();
    let expected: Vec<u32> = (1..=result.steps.len() as u32).collect();
    assert_eq!(ordinals, expected);
    assert_eq!(result.steps[0].description, "Calculate total bag run time");
    assert_eq!(result.steps.last().unwrap().description, "Calculate final bag volume");
}

#[test]
fn test_duration_flow() {
    let request = InfusionRequest::with_flow(
        30.0,
        1000.0,
        FlowSpec::Duration { hours: 24.0 },
        vec![InfusionDrug::new(
            "ketamine",
            DoseRate::mg_per_kg_per_hour(0.6),
            Concentration::mg_per_ml(100.0),
        )],
    );
    let result = calculator().compute(&request).unwrap();
    assert_abs_diff_eq!(result.flow_rate_ml_per_hour, 1000.0 / 24.0, epsilon = 1e-9);
    assert_abs_diff_eq!(result.total_run_time_hours, 24.0, epsilon = 1e-9);
    assert_abs_diff_eq!(result.drug_volumes[0].volume_to_add_ml, 4.32, epsilon = 1e-9);
}

proptest! {
    #[test]
    fn prop_run_time_is_bag_over_flow(
        bag in 50.0f64..3000.0,
        flow in 0.5f64..250.0,
    ) {
        let result = calculator().compute(&single_drug(10.0, bag, flow, 2.0, 20.0)).unwrap();
        prop_assert!((result.total_run_time_hours - bag / flow).abs() <= 1e-9 * (bag / flow));
    }

    #[test]
    fn prop_volume_formula(
        weight in 0.5f64..600.0,
        bag in 50.0f64..3000.0,
        flow in 0.5f64..250.0,
        dose in 0.01f64..10.0,
        conc in 0.1f64..200.0,
    ) {
        let result = calculator().compute(&single_drug(weight, bag, flow, dose, conc)).unwrap();
        let expected = dose * weight * (bag / flow) / conc;
        let actual = result.drug_volumes[0].volume_to_add_ml;
        prop_assert!((actual - expected).abs() <= 1e-9 * expected.max(1.0));
        prop_assert!((result.final_bag_volume_ml - (bag + actual)).abs() <= 1e-9 * result.final_bag_volume_ml);
    }

    #[test]
    fn prop_non_positive_flow_is_division_by_zero(flow in -100.0f64..=0.0) {
        let outcome = calculator().compute(&single_drug(10.0, 500.0, flow, 2.0, 20.0));
        let is_division_by_zero = matches!(outcome, Err(CalcError::DivisionByZero { .. }));
        prop_assert!(is_division_by_zero);
    }
}
