//! End-to-end tests: query text through the engine to an audit record.

use approx::assert_abs_diff_eq;
use vetdose_core::export::{AuditError, AuditRecord, DISCLAIMER};
use vetdose_core::models::{IssueKind, QueryContext, RequestField, RiskLevel};
use vetdose_core::{DosingEngine, EngineConfig, EngineOutcome, MissingField};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const MLK: &str = "20 kg dog, 500 mL bag at 10 mL/hr. Morphine 0.1 mg/kg/hr (15 mg/mL), \
                   lidocaine 2 mg/kg/hr (20 mg/mL), ketamine 0.6 mg/kg/hr (100 mg/mL)";

#[test]
fn test_mlk_query_end_to_end() {
    init_logging();
    let engine = DosingEngine::new();
    let assessment = match engine.process(MLK, &QueryContext::new()) {
        EngineOutcome::Assessed(a) => a,
        other => panic!("expected assessment, got {:?}", other),
    };

    // 500 mL at 10 mL/hr runs 50 hours
    assert_abs_diff_eq!(assessment.result.total_run_time_hours, 50.0, epsilon = 1e-9);
    let volumes = assessment.result.volumes_by_drug();
    assert_abs_diff_eq!(volumes["morphine"], 0.1 * 20.0 * 50.0 / 15.0, epsilon = 1e-9);
    assert_abs_diff_eq!(volumes["lidocaine"], 100.0, epsilon = 1e-9);
    assert_abs_diff_eq!(volumes["ketamine"], 6.0, epsilon = 1e-9);

    assert!(assessment.validation.is_valid);
    // morphine is a critical drug
    assert_eq!(assessment.validation.risk_level, RiskLevel::Critical);
    assert!(assessment.requires_manual_review);
    assert!(assessment.report.contains("PHARMACOLOGICAL INTERACTION ANALYSIS"));
    assert!(assessment.report.ends_with(DISCLAIMER));
}

#[test]
fn test_heuristic_query_always_needs_review() {
    init_logging();
    let engine = DosingEngine::with_config(EngineConfig {
        heuristic_fallback: true,
        ..EngineConfig::default()
    })
    .unwrap();

    let outcome = engine.process(
        "cat needs a ketamine CRI at 0.6 mg/kg/hr in a standard bag",
        &QueryContext::new(),
    );
    let assessment = match outcome {
        EngineOutcome::Assessed(a) => a,
        other => panic!("expected assessment, got {:?}", other),
    };
    assert!(assessment.result.provenance.is_heuristic());
    assert!(assessment
        .result
        .provenance
        .substituted()
        .contains(&RequestField::Weight));
    assert!(assessment.validation.has_issue(IssueKind::HeuristicInput));
    assert!(assessment.validation.confidence <= 0.5);
    assert!(assessment.requires_manual_review);
}

#[test]
fn test_default_engine_refuses_to_guess() {
    let outcome = DosingEngine::new().process(
        "cat needs a ketamine CRI at 0.6 mg/kg/hr in a standard bag",
        &QueryContext::new(),
    );
    match outcome {
        EngineOutcome::InsufficientInformation { missing } => {
            assert!(missing.contains(&MissingField::Weight));
            assert!(missing.contains(&MissingField::BagVolume));
        }
        other => panic!("expected insufficient information, got {:?}", other),
    }
}

#[test]
fn test_audit_record_from_assessment() {
    init_logging();
    let engine = DosingEngine::new();
    let assessment = match engine.process(MLK, &QueryContext::new()) {
        EngineOutcome::Assessed(a) => a,
        other => panic!("expected assessment, got {:?}", other),
    };

    let record = AuditRecord::new(
        assessment.request,
        assessment.result,
        assessment.validation,
        assessment.interactions,
    )
    .unwrap();
    record.verify_digest().unwrap();
    record.replay(engine.calculator()).unwrap();

    let restored = AuditRecord::from_json(&record.to_json().unwrap()).unwrap();
    assert_eq!(restored.digest, record.digest);
    restored.verify_digest().unwrap();

    let mut tampered = restored;
    tampered.request.weight_kg = 25.0;
    assert!(matches!(
        tampered.verify_digest(),
        Err(AuditError::DigestMismatch { .. })
    ));
}

#[test]
fn test_identical_requests_hash_identically() {
    let engine = DosingEngine::new();
    let digest = || match engine.process(MLK, &QueryContext::new()) {
        EngineOutcome::Assessed(a) => {
            AuditRecord::new(a.request, a.result, a.validation, a.interactions)
                .unwrap()
                .digest
        }
        other => panic!("expected assessment, got {:?}", other),
    };
    assert_eq!(digest(), digest());
}
