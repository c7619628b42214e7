//! Mechanism-based interaction rule engine.
//!
//! Pipeline per unordered pair: Resolve names → General rules → Curated
//! interactions (replace general hits of the same type) → Condition rules.
//! Results are sorted most severe first, then by confidence.

mod conditions;
mod rules;
mod specific;

pub use conditions::{has_hepatic_condition, HEPATIC_CONDITIONS};
pub use rules::{MechanismRule, GENERAL_RULES, GENERAL_RULE_CONFIDENCE};
pub use specific::CURATED_CHECKS;

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::models::{
    DrugInteraction, DrugMechanism, InteractionSource, InteractionType, Partner, Severity,
};
use crate::registry::{DrugRegistry, ResolvedName, DEFAULT_FUZZY_THRESHOLD};

/// Confidence of the placeholder emitted for pairs without mechanism data.
pub const INSUFFICIENT_DATA_CONFIDENCE: f64 = 0.3;

/// A requested drug after name resolution.
#[derive(Debug, Clone)]
enum Subject<'r> {
    Known {
        mechanism: &'r DrugMechanism,
        score: f64,
    },
    Unknown(String),
}

impl Subject<'_> {
    fn name(&self) -> &str {
        match self {
            Subject::Known { mechanism, .. } => &mechanism.name,
            Subject::Unknown(name) => name,
        }
    }
}

/// Evaluates drug pairs against the registry.
pub struct InteractionEngine {
    registry: Arc<DrugRegistry>,
    fuzzy_threshold: f64,
}

impl InteractionEngine {
    pub fn new(registry: Arc<DrugRegistry>) -> Self {
        Self {
            registry,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }

    pub fn with_config(registry: Arc<DrugRegistry>, config: &EngineConfig) -> Self {
        Self {
            registry,
            fuzzy_threshold: config.fuzzy_name_threshold,
        }
    }

    pub fn registry(&self) -> &DrugRegistry {
        &self.registry
    }

    /// All interactions among `drugs`, given the patient `conditions`.
    pub fn interactions<D, C>(&self, drugs: &[D], conditions: &[C]) -> Vec<DrugInteraction>
    where
        D: AsRef<str>,
        C: AsRef<str>,
    {
        let conditions: Vec<String> = conditions
            .iter()
            .map(|c| c.as_ref().trim().to_lowercase().replace(' ', "_"))
            .filter(|c| !c.is_empty())
            .collect();
        let subjects = self.resolve_subjects(drugs);

        log::info!(
            "checking interactions for {} drugs, {} conditions",
            subjects.len(),
            conditions.len()
        );

        let mut found = Vec::new();

        for subject in &subjects {
            if let Subject::Known { mechanism, score } = subject {
                for mut hit in conditions::contraindications(mechanism, &conditions) {
                    hit.confidence *= score;
                    found.push(hit);
                }
            }
        }

        for (i, first) in subjects.iter().enumerate() {
            for second in &subjects[i + 1..] {
                found.extend(self.pair_interactions(first, second, &conditions));
            }
        }

        sort_interactions(&mut found);
        log::debug!("found {} interactions", found.len());
        found
    }

    /// De-duplicated subjects in request order.
    fn resolve_subjects<D: AsRef<str>>(&self, drugs: &[D]) -> Vec<Subject<'_>> {
        let mut subjects: Vec<Subject<'_>> = Vec::new();
        for raw in drugs {
            let raw = raw.as_ref();
            let subject = match self
                .registry
                .resolve_with_threshold(raw, self.fuzzy_threshold)
                .and_then(|ResolvedName { canonical, score, .. }| {
                    self.registry
                        .get(&canonical)
                        .map(|mechanism| Subject::Known { mechanism, score })
                }) {
                Some(known) => known,
                None => {
                    let name = DrugRegistry::normalize_name(raw);
                    if name.is_empty() {
                        continue;
                    }
                    log::warn!("no mechanism data for requested drug");
                    Subject::Unknown(name)
                }
            };
            if !subjects.iter().any(|s| s.name() == subject.name()) {
                subjects.push(subject);
            }
        }
        subjects
    }

    fn pair_interactions(
        &self,
        first: &Subject<'_>,
        second: &Subject<'_>,
        conditions: &[String],
    ) -> Vec<DrugInteraction> {
        let (a, score_a, b, score_b) = match (first, second) {
            (
                Subject::Known { mechanism: a, score: sa },
                Subject::Known { mechanism: b, score: sb },
            ) => (*a, *sa, *b, *sb),
            _ => return vec![insufficient_data(first.name(), second.name())],
        };

        let mut hits = general_interactions(a, b);
        let curated = dedupe_by_type(specific::curated_interactions(a, b), |x, y| {
            x.confidence > y.confidence
        });
        hits.retain(|g| {
            !curated
                .iter()
                .any(|c| c.interaction_type == g.interaction_type)
        });
        hits.extend(curated);
        hits.extend(conditions::hepatic_concern(a, b, conditions));

        let scale = score_a.min(score_b);
        if scale < 1.0 {
            for hit in &mut hits {
                hit.confidence *= scale;
            }
        }
        hits
    }
}

/// General-rule hits for a pair, one per interaction type (highest severity wins).
fn general_interactions(a: &DrugMechanism, b: &DrugMechanism) -> Vec<DrugInteraction> {
    let hits = GENERAL_RULES
        .iter()
        .filter_map(|rule| {
            let (perpetrator, affected) = if rule.matches(a, b) {
                (a, b)
            } else if rule.matches(b, a) {
                (b, a)
            } else {
                return None;
            };
            Some(DrugInteraction {
                drug: perpetrator.name.clone(),
                partner: Partner::Drug(affected.name.clone()),
                interaction_type: rule.interaction_type,
                severity: rule.severity,
                mechanism: rule.mechanism.into(),
                clinical_effect: rule.clinical_effect.into(),
                management: rule.management.into(),
                confidence: GENERAL_RULE_CONFIDENCE,
                source: InteractionSource::MechanismRule(rule.id.into()),
            })
        })
        .collect();
    dedupe_by_type(hits, |x, y| x.severity > y.severity)
}

/// Keep one hit per interaction type; `better(new, kept)` decides replacement.
fn dedupe_by_type(
    hits: Vec<DrugInteraction>,
    better: impl Fn(&DrugInteraction, &DrugInteraction) -> bool,
) -> Vec<DrugInteraction> {
    let mut kept: Vec<DrugInteraction> = Vec::with_capacity(hits.len());
    for hit in hits {
        match kept
            .iter_mut()
            .find(|k| k.interaction_type == hit.interaction_type)
        {
            Some(existing) => {
                if better(&hit, existing) {
                    *existing = hit;
                }
            }
            None => kept.push(hit),
        }
    }
    kept
}

fn insufficient_data(first: &str, second: &str) -> DrugInteraction {
    DrugInteraction {
        drug: first.to_string(),
        partner: Partner::Drug(second.to_string()),
        interaction_type: InteractionType::Pharmacodynamic,
        severity: Severity::Minor,
        mechanism: "Insufficient mechanism data available".into(),
        clinical_effect: "Potential interaction cannot be fully assessed".into(),
        management: "Monitor patient closely, consult additional references".into(),
        confidence: INSUFFICIENT_DATA_CONFIDENCE,
        source: InteractionSource::InsufficientData,
    }
}

/// Stable sort: severity descending, then confidence descending.
pub fn sort_interactions(interactions: &mut [DrugInteraction]) {
    interactions.sort_by(|x, y| {
        y.severity
            .cmp(&x.severity)
            .then(y.confidence.total_cmp(&x.confidence))
    });
}
