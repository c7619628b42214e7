//! Heuristic fallback for missing request fields.
//!
//! Substitutions only happen when `heuristic_fallback` is enabled, and every
//! one is recorded so the request's provenance shows it.

use super::drugs::catalogue_drug;
use super::patterns;
use crate::config::EngineConfig;
use crate::models::{Concentration, FlowSpec, Provenance, RequestField};

/// Bag volume assumed for "standard bag" phrasing.
pub const STANDARD_BAG_ML: f64 = 500.0;

pub struct Fallback<'c> {
    config: &'c EngineConfig,
    substituted: Vec<RequestField>,
}

impl<'c> Fallback<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Self {
            config,
            substituted: Vec::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.heuristic_fallback
    }

    /// Record a field whose value is an assumption rather than a parsed fact.
    pub fn note(&mut self, field: RequestField) {
        if !self.substituted.contains(&field) {
            self.substituted.push(field);
        }
    }

    pub fn weight(&mut self, species: Option<&str>) -> Option<f64> {
        if !self.enabled() {
            return None;
        }
        self.note(RequestField::Weight);
        Some(self.config.default_weight_for(species))
    }

    pub fn bag_volume(&mut self, text: &str) -> Option<f64> {
        if !self.enabled() {
            return None;
        }
        self.note(RequestField::BagVolume);
        if patterns::STANDARD_BAG.is_match(text) {
            Some(STANDARD_BAG_ML)
        } else {
            Some(self.config.default_bag_volume_ml)
        }
    }

    pub fn flow(&mut self) -> Option<FlowSpec> {
        if !self.enabled() {
            return None;
        }
        self.note(RequestField::FlowRate);
        Some(FlowSpec::Rate {
            ml_per_hour: self.config.default_flow_rate_ml_per_hour,
        })
    }

    /// Maintenance phrasing is always an assumption about the fluid rate.
    pub fn maintenance_flow(&mut self) -> FlowSpec {
        self.note(RequestField::FlowRate);
        FlowSpec::Maintenance {
            ml_per_kg_per_hour: self.config.maintenance_ml_per_kg_per_hour,
        }
    }

    /// Usual stock concentration for a catalogue drug.
    pub fn concentration(&mut self, drug: &str) -> Option<Concentration> {
        if !self.enabled() {
            return None;
        }
        let stock = catalogue_drug(drug)?.stock;
        self.note(RequestField::Concentration {
            drug: drug.to_string(),
        });
        Some(stock)
    }

    pub fn into_provenance(self) -> Provenance {
        if self.substituted.is_empty() {
            Provenance::Parsed
        } else {
            Provenance::Heuristic {
                substituted: self.substituted,
            }
        }
    }
}
