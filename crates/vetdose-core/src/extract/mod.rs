//! Parameter extraction from free-text clinical queries.
//!
//! Pipeline: Field extractors (weight, bag, flow, drugs) → Heuristic fallback
//! (only when enabled) → `ExtractionOutcome`.
//!
//! Each field extractor is a small pure function returning `Option`. They do
//! not see each other's results. Precedence within a field is the order of
//! its pattern list; for flow, a stated rate beats a stated duration, which
//! beats "maintenance rate" phrasing.

mod drugs;
mod heuristic;
pub(crate) mod patterns;

pub use drugs::{catalogue_drug, find_mentions, scan_drugs, CatalogueDrug, DrugFinding, Mention, CATALOGUE};
pub use heuristic::{Fallback, STANDARD_BAG_ML};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::models::{FlowSpec, InfusionDrug, InfusionRequest, QueryContext};
use crate::registry::DrugRegistry;

const LB_PER_KG: f64 = 2.20462;

/// A required request field that could not be found.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum MissingField {
    Weight,
    BagVolume,
    FlowRate,
    /// No catalogue drug was mentioned
    Drugs,
    Dose { drug: String },
    Concentration { drug: String },
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::Weight => write!(f, "patient weight"),
            MissingField::BagVolume => write!(f, "bag volume"),
            MissingField::FlowRate => write!(f, "flow rate or duration"),
            MissingField::Drugs => write!(f, "infusion drug"),
            MissingField::Dose { drug } => write!(f, "{} dose", drug),
            MissingField::Concentration { drug } => write!(f, "{} concentration", drug),
        }
    }
}

/// Result of extracting an infusion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Complete(InfusionRequest),
    Incomplete { missing: Vec<MissingField> },
}

impl ExtractionOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, ExtractionOutcome::Complete(_))
    }

    pub fn request(&self) -> Option<&InfusionRequest> {
        match self {
            ExtractionOutcome::Complete(request) => Some(request),
            ExtractionOutcome::Incomplete { .. } => None,
        }
    }
}

/// Converts query text into an [`InfusionRequest`].
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: EngineConfig,
}

impl Extractor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn extract(&self, text: &str) -> ExtractionOutcome {
        let species = extract_species(text);
        let mut fallback = Fallback::new(&self.config);
        let mut missing = Vec::new();

        let weight = extract_weight(text).or_else(|| fallback.weight(species.as_deref()));
        if weight.is_none() {
            missing.push(MissingField::Weight);
        }

        let bag = extract_bag_volume(text).or_else(|| fallback.bag_volume(text));
        if bag.is_none() {
            missing.push(MissingField::BagVolume);
        }

        let flow = extract_flow(text)
            .or_else(|| mentions_maintenance_rate(text).then(|| fallback.maintenance_flow()))
            .or_else(|| fallback.flow());
        if flow.is_none() {
            missing.push(MissingField::FlowRate);
        }

        let findings = scan_drugs(text);
        if findings.is_empty() {
            missing.push(MissingField::Drugs);
        }
        let mut drugs = Vec::with_capacity(findings.len());
        for finding in findings {
            let Some(dose) = finding.dose else {
                missing.push(MissingField::Dose {
                    drug: finding.drug.to_string(),
                });
                continue;
            };
            match finding
                .concentration
                .or_else(|| fallback.concentration(finding.drug))
            {
                Some(concentration) => drugs.push(InfusionDrug::new(finding.drug, dose, concentration)),
                None => missing.push(MissingField::Concentration {
                    drug: finding.drug.to_string(),
                }),
            }
        }

        let (Some(weight), Some(bag), Some(flow), true) = (weight, bag, flow, missing.is_empty()) else {
            log::debug!("extraction incomplete: {} missing fields", missing.len());
            return ExtractionOutcome::Incomplete { missing };
        };

        let provenance = fallback.into_provenance();
        if provenance.is_heuristic() {
            log::warn!(
                "heuristic substitution for {} fields",
                provenance.substituted().len()
            );
        }
        log::info!("extracted CRI request with {} drugs", drugs.len());

        let mut request = InfusionRequest::with_flow(weight, bag, flow, drugs).with_provenance(provenance);
        request.species = species;
        ExtractionOutcome::Complete(request)
    }
}

// ============================================================================
// Field extractors
// ============================================================================

fn first_number(regex: &regex::Regex, text: &str) -> Option<f64> {
    regex
        .captures(text)
        .and_then(|caps| patterns::parse_number(caps.get(1)?.as_str()))
}

/// Patient weight in kg; pounds are converted.
pub fn extract_weight(text: &str) -> Option<f64> {
    first_number(&patterns::WEIGHT_KG, text)
        .or_else(|| first_number(&patterns::WEIGHT_LB, text).map(|lb| lb / LB_PER_KG))
}

/// Bag volume in mL; liters are converted.
pub fn extract_bag_volume(text: &str) -> Option<f64> {
    let candidates = [
        (&*patterns::BAG_BEFORE, false),
        (&*patterns::BAG_FLUID, false),
        (&*patterns::BAG_AFTER, true),
        (&*patterns::BAG_IN, true),
    ];
    for (regex, reject_rate) in candidates {
        for caps in regex.captures_iter(text) {
            if reject_rate && caps.get(3).is_some() {
                continue;
            }
            let (Some(value), Some(unit)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let Some(value) = patterns::parse_number(value.as_str()) else {
                continue;
            };
            return Some(if unit.as_str().eq_ignore_ascii_case("l") {
                value * 1000.0
            } else {
                value
            });
        }
    }
    None
}

/// Stated flow rate, else stated duration.
pub fn extract_flow(text: &str) -> Option<FlowSpec> {
    let rate = patterns::FLOW_RATE
        .iter()
        .find_map(|regex| first_number(regex, text))
        .map(|ml_per_hour| FlowSpec::Rate { ml_per_hour });
    rate.or_else(|| {
        patterns::DURATION
            .iter()
            .find_map(|regex| first_number(regex, text))
            .map(|hours| FlowSpec::Duration { hours })
    })
}

pub fn mentions_maintenance_rate(text: &str) -> bool {
    patterns::MAINTENANCE.is_match(text)
}

/// Earliest species mention in the text.
pub fn extract_species(text: &str) -> Option<String> {
    patterns::SPECIES
        .iter()
        .filter_map(|(regex, species)| regex.find(text).map(|m| (m.start(), *species)))
        .min_by_key(|(start, _)| *start)
        .map(|(_, species)| species.to_string())
}

/// Condition tags, in tag-table order.
pub fn extract_conditions(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for (regex, tag) in patterns::CONDITIONS.iter() {
        if regex.is_match(text) && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

// ============================================================================
// Routing and context
// ============================================================================

/// Whether the query is an infusion calculation request.
pub fn is_infusion_query(text: &str) -> bool {
    patterns::INFUSION_INDICATORS.iter().any(|regex| regex.is_match(text))
}

/// Facts about the patient and drugs mentioned in `text`.
pub fn extract_context(text: &str) -> QueryContext {
    extract_context_with(text, &DrugRegistry::shared())
}

pub fn extract_context_with(text: &str, registry: &DrugRegistry) -> QueryContext {
    QueryContext {
        weight_kg: extract_weight(text),
        species: extract_species(text),
        drugs: mentioned_drugs(text, registry),
        conditions: extract_conditions(text),
        interaction_query: patterns::INTERACTION_QUERY.is_match(text),
        request: None,
        result: None,
    }
}

/// Catalogue and registry drugs in order of first mention.
///
/// Registry aliases shorter than four characters ("ace", "pb") are too
/// ambiguous in free text and are skipped; catalogue synonyms are not.
fn mentioned_drugs(text: &str, registry: &DrugRegistry) -> Vec<String> {
    let mut found: Vec<(usize, String)> = find_mentions(text)
        .into_iter()
        .map(|m| (m.start, m.drug.to_string()))
        .collect();

    for word in patterns::WORD.find_iter(text) {
        let token = word.as_str();
        if token.chars().count() < 4 {
            continue;
        }
        if let Some(resolved) = registry.lookup(token) {
            found.push((word.start(), resolved.canonical));
        }
    }

    found.sort_by_key(|(start, _)| *start);
    let mut drugs: Vec<String> = Vec::new();
    for (_, name) in found {
        if !drugs.contains(&name) {
            drugs.push(name);
        }
    }
    drugs
}
