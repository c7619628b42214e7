//! Engine configuration.
//!
//! All thresholds have safe defaults; a JSON document only needs the keys it
//! wants to override.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Species key used when no species is known.
pub const GENERIC_SPECIES: &str = "generic";

/// Tunable thresholds and heuristic defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Relative disagreement above which a re-derivation is a hard error
    pub relative_tolerance: f64,
    /// Drug volume / bag volume above which displacement is warned about
    pub displacement_warning_fraction: f64,
    /// More drugs than this in one request forces manual review
    pub max_confident_drugs: usize,
    /// Allow species defaults to fill missing request fields
    pub heuristic_fallback: bool,
    /// Default weights by species, plus a "generic" entry
    pub species_default_weights_kg: BTreeMap<String, f64>,
    /// Bag volume substituted under heuristic fallback
    pub default_bag_volume_ml: f64,
    /// Flow rate substituted under heuristic fallback
    pub default_flow_rate_ml_per_hour: f64,
    /// Maintenance fluid rate used for "maintenance rate" phrasing
    pub maintenance_ml_per_kg_per_hour: f64,
    /// Minimum similarity for fuzzy drug-name resolution
    pub fuzzy_name_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut weights = BTreeMap::new();
        weights.insert("feline".to_string(), 4.0);
        weights.insert("canine".to_string(), 25.0);
        weights.insert(GENERIC_SPECIES.to_string(), 20.0);

        Self {
            relative_tolerance: 0.10,
            displacement_warning_fraction: 0.20,
            max_confident_drugs: 4,
            heuristic_fallback: false,
            species_default_weights_kg: weights,
            default_bag_volume_ml: 500.0,
            default_flow_rate_ml_per_hour: 15.0,
            maintenance_ml_per_kg_per_hour: 3.0,
            fuzzy_name_threshold: 0.92,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        log::debug!("loading engine config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values that would make the engine unsafe or meaningless.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.relative_tolerance > 0.0 && self.relative_tolerance < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "relative_tolerance must be in (0, 1), got {}",
                self.relative_tolerance
            )));
        }
        if !(self.displacement_warning_fraction > 0.0 && self.displacement_warning_fraction <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "displacement_warning_fraction must be in (0, 1], got {}",
                self.displacement_warning_fraction
            )));
        }
        if self.max_confident_drugs < 1 {
            return Err(ConfigError::Invalid(
                "max_confident_drugs must be at least 1".into(),
            ));
        }
        if !(self.fuzzy_name_threshold > 0.0 && self.fuzzy_name_threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "fuzzy_name_threshold must be in (0, 1], got {}",
                self.fuzzy_name_threshold
            )));
        }

        let positive = [
            ("default_bag_volume_ml", self.default_bag_volume_ml),
            ("default_flow_rate_ml_per_hour", self.default_flow_rate_ml_per_hour),
            ("maintenance_ml_per_kg_per_hour", self.maintenance_ml_per_kg_per_hour),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)));
            }
        }

        for (species, weight) in &self.species_default_weights_kg {
            if !(weight.is_finite() && *weight > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "default weight for {} must be positive, got {}",
                    species, weight
                )));
            }
        }
        if !self.species_default_weights_kg.contains_key(GENERIC_SPECIES) {
            return Err(ConfigError::Invalid(format!(
                "species_default_weights_kg must contain a \"{}\" entry",
                GENERIC_SPECIES
            )));
        }

        Ok(())
    }

    /// Default weight for a species, falling back to the generic entry.
    pub fn default_weight_for(&self, species: Option<&str>) -> f64 {
        species
            .and_then(|s| self.species_default_weights_kg.get(&s.to_lowercase()))
            .or_else(|| self.species_default_weights_kg.get(GENERIC_SPECIES))
            .copied()
            .unwrap_or(20.0)
    }
}
