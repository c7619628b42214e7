//! Caller-supplied query context.

use serde::{Deserialize, Serialize};

use super::calculation::CalculationResult;
use super::infusion::InfusionRequest;

/// Already-known facts about the patient and the conversation.
///
/// Built either by the calling assistant layer or by
/// [`extract_context`](crate::extract::extract_context) from the query text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct QueryContext {
    /// Patient weight in kg
    pub weight_kg: Option<f64>,
    /// Patient species (canine, feline, equine, bovine)
    pub species: Option<String>,
    /// Drugs mentioned so far, in order of first mention
    pub drugs: Vec<String>,
    /// Patient-condition tags (e.g. "liver_disease")
    pub conditions: Vec<String>,
    /// Whether the query asks about drug interactions
    pub interaction_query: bool,
    /// Structured request, if the caller already has one
    pub request: Option<InfusionRequest>,
    /// Calculation to validate, if the caller already has one
    pub result: Option<CalculationResult>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(mut self, weight_kg: f64) -> Self {
        self.weight_kg = Some(weight_kg);
        self
    }

    pub fn with_species(mut self, species: impl Into<String>) -> Self {
        self.species = Some(species.into());
        self
    }

    pub fn with_drugs(mut self, drugs: Vec<String>) -> Self {
        self.drugs = drugs;
        self
    }

    pub fn with_conditions(mut self, conditions: Vec<String>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Attach a structured request and its computed result.
    pub fn with_calculation(mut self, request: InfusionRequest, result: CalculationResult) -> Self {
        self.request = Some(request);
        self.result = Some(result);
        self
    }

    /// Condition tags plus the species, as passed to the interaction engine.
    pub fn patient_tags(&self) -> Vec<String> {
        let mut tags = self.conditions.clone();
        if let Some(species) = &self.species {
            let species = species.to_lowercase();
            if !tags.contains(&species) {
                tags.push(species);
            }
        }
        tags
    }

    /// Merge facts from `other` that this context does not already have.
    pub fn merge(mut self, other: QueryContext) -> Self {
        if self.weight_kg.is_none() {
            self.weight_kg = other.weight_kg;
        }
        if self.species.is_none() {
            self.species = other.species;
        }
        for drug in other.drugs {
            if !self.drugs.contains(&drug) {
                self.drugs.push(drug);
            }
        }
        for condition in other.conditions {
            if !self.conditions.contains(&condition) {
                self.conditions.push(condition);
            }
        }
        self.interaction_query |= other.interaction_query;
        if self.request.is_none() {
            self.request = other.request;
        }
        if self.result.is_none() {
            self.result = other.result;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_tags_include_species() {
        let ctx = QueryContext::new()
            .with_species("Feline")
            .with_conditions(vec!["kidney_disease".into()]);
        assert_eq!(ctx.patient_tags(), vec!["kidney_disease".to_string(), "feline".to_string()]);
    }

    #[test]
    fn test_merge_keeps_caller_values() {
        let caller = QueryContext::new().with_weight(12.0).with_drugs(vec!["morphine".into()]);
        let parsed = QueryContext::new()
            .with_weight(30.0)
            .with_species("canine")
            .with_drugs(vec!["morphine".into(), "lidocaine".into()]);

        let merged = caller.merge(parsed);
        assert_eq!(merged.weight_kg, Some(12.0));
        assert_eq!(merged.species.as_deref(), Some("canine"));
        assert_eq!(merged.drugs, vec!["morphine".to_string(), "lidocaine".to_string()]);
    }
}
