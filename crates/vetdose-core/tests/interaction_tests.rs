//! Interaction scenarios against the built-in registry.

use vetdose_core::interactions::{InteractionEngine, INSUFFICIENT_DATA_CONFIDENCE};
use vetdose_core::models::{InteractionType, Partner, Severity};
use vetdose_core::registry::DrugRegistry;

const NONE: [&str; 0] = [];

fn engine() -> InteractionEngine {
    InteractionEngine::new(DrugRegistry::shared())
}

#[test]
fn test_inducer_and_substrate() {
    let hits = engine().interactions(&["phenobarbital", "diazepam"], &NONE);
    let induction = hits
        .iter()
        .find(|h| h.interaction_type == InteractionType::EnzymeInduction)
        .expect("enzyme induction interaction");
    assert!(induction.severity >= Severity::Moderate);
    assert!(induction.confidence > 0.0);
    assert_eq!(induction.drug, "phenobarbital");
}

#[test]
fn test_unknown_drugs_yield_one_placeholder() {
    let hits = engine().interactions(&["UnlistedDrugX", "UnlistedDrugY"], &NONE);
    assert_eq!(hits.len(), 1);
    assert!(hits[0].is_insufficient_data());
    assert_eq!(hits[0].confidence, INSUFFICIENT_DATA_CONFIDENCE);
}

#[test]
fn test_order_does_not_change_findings() {
    let forward = engine().interactions(&["phenobarbital", "diazepam", "carprofen"], &["liver_disease"]);
    let reverse = engine().interactions(&["carprofen", "diazepam", "phenobarbital"], &["liver_disease"]);

    let mut forward_keys: Vec<_> = forward.iter().map(|h| (h.pair_key(), h.interaction_type)).collect();
    let mut reverse_keys: Vec<_> = reverse.iter().map(|h| (h.pair_key(), h.interaction_type)).collect();
    forward_keys.sort_by(|a, b| format!("{:?}", a).cmp(&format!("{:?}", b)));
    reverse_keys.sort_by(|a, b| format!("{:?}", a).cmp(&format!("{:?}", b)));
    assert_eq!(forward_keys, reverse_keys);
}

#[test]
fn test_brand_names_and_conditions() {
    let hits = engine().interactions(&["Rimadyl", "Metacam"], &["kidney disease"]);
    assert!(hits.iter().any(|h| h.drug == "carprofen"
        && h.partner == Partner::Condition("kidney_disease".into())
        && h.severity == Severity::Contraindicated));
    assert!(hits.iter().any(|h| h.involves("meloxicam")));
    for window in hits.windows(2) {
        assert!(window[0].severity >= window[1].severity);
    }
}

#[test]
fn test_registry_shared_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(|| {
                InteractionEngine::new(DrugRegistry::shared())
                    .interactions(&["phenobarbital", "diazepam"], &NONE)
                    .len()
            })
        })
        .collect();
    let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(counts.windows(2).all(|w| w[0] == w[1]));
    assert!(counts[0] > 0);
}
