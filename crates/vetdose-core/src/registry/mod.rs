//! Drug mechanism registry.
//!
//! An immutable table of pharmacological attributes, built once per process
//! and shared by reference. Nothing in a request can mutate it, so it can be
//! read from any number of threads without locking.

mod data;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::models::DrugMechanism;

/// Fuzzy threshold used when the caller does not supply one.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.92;

static SHARED: Lazy<Arc<DrugRegistry>> = Lazy::new(|| Arc::new(DrugRegistry::builtin()));

/// How a name was matched to a registry entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NameMatch {
    Exact,
    Alias,
    Fuzzy,
}

/// A drug name resolved to its canonical registry key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedName {
    /// Canonical registry key
    pub canonical: String,
    /// Match quality (1.0 for exact and alias matches)
    pub score: f64,
    pub method: NameMatch,
}

/// Hepatic-metabolism dependency tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HepaticTier {
    High,
    Moderate,
    Low,
    Minimal,
    Unknown,
}

/// Hepatic-metabolism summary for one drug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HepaticProfile {
    /// Drug name as requested
    pub drug: String,
    pub hepatic_metabolism_pct: Option<f64>,
    pub tier: HepaticTier,
    pub principle: String,
    pub clinical_significance: String,
    pub contraindications: Vec<String>,
}

/// Read-only drug mechanism table.
#[derive(Debug, Clone)]
pub struct DrugRegistry {
    mechanisms: HashMap<String, DrugMechanism>,
    aliases: HashMap<String, String>,
}

impl DrugRegistry {
    /// Build the registry from the built-in pharmacology table.
    pub fn builtin() -> Self {
        let registry = Self::from_parts(data::builtin_mechanisms(), data::builtin_aliases());
        log::debug!("built drug registry with {} entries", registry.len());
        registry
    }

    /// Process-wide built-in registry.
    pub fn shared() -> Arc<DrugRegistry> {
        Arc::clone(&SHARED)
    }

    /// Build a registry from explicit entries (used by tests and embedders).
    pub fn from_parts(mechanisms: Vec<DrugMechanism>, aliases: HashMap<String, String>) -> Self {
        Self {
            mechanisms: mechanisms
                .into_iter()
                .map(|m| (m.name.to_lowercase(), m))
                .collect(),
            aliases: aliases
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.mechanisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mechanisms.is_empty()
    }

    /// Look up by exact canonical key.
    pub fn get(&self, canonical: &str) -> Option<&DrugMechanism> {
        self.mechanisms.get(canonical)
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.mechanisms.contains_key(canonical)
    }

    /// Canonical names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.mechanisms.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Alias keys, sorted.
    pub fn alias_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.aliases.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Normalize a raw name: lowercase, trim, drop formulation words.
    pub fn normalize_name(name: &str) -> String {
        let lower = name.trim().to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| c.is_whitespace() || c == '_')
            .filter(|t| !t.is_empty())
            .filter(|t| !data::FORMULATION_WORDS.contains(t))
            .filter(|t| !t.starts_with(|c: char| c.is_ascii_digit()))
            .collect();
        tokens.join(" ")
    }

    /// Resolve a raw name using the default fuzzy threshold.
    pub fn resolve(&self, name: &str) -> Option<ResolvedName> {
        self.resolve_with_threshold(name, DEFAULT_FUZZY_THRESHOLD)
    }

    /// Resolve a raw name: exact key, then alias, then per-token, then fuzzy.
    pub fn resolve_with_threshold(&self, name: &str, threshold: f64) -> Option<ResolvedName> {
        let normalized = Self::normalize_name(name);
        if normalized.is_empty() {
            return None;
        }

        if let Some(found) = self.lookup_exact(&normalized) {
            return Some(found);
        }

        // "clavamox drops", "potassium clavulanate": try each token
        for token in normalized.split(' ') {
            if let Some(found) = self.lookup_exact(token) {
                return Some(found);
            }
        }

        let fuzzy = self.fuzzy_match(&normalized, threshold);
        if let Some(found) = &fuzzy {
            log::debug!(
                "fuzzy-resolved drug name to {} (score {:.3})",
                found.canonical,
                found.score
            );
        }
        fuzzy
    }

    /// Resolve and fetch in one step.
    pub fn mechanism_for(&self, name: &str) -> Option<&DrugMechanism> {
        self.resolve(name).and_then(|r| self.get(&r.canonical))
    }

    /// Canonical name if resolvable, else the normalized input.
    pub fn canonical_name(&self, name: &str) -> String {
        self.resolve(name)
            .map(|r| r.canonical)
            .unwrap_or_else(|| Self::normalize_name(name))
    }

    /// Exact key or alias lookup, without token splitting or fuzzy matching.
    pub fn lookup(&self, name: &str) -> Option<ResolvedName> {
        self.lookup_exact(&Self::normalize_name(name))
    }

    fn lookup_exact(&self, key: &str) -> Option<ResolvedName> {
        if self.mechanisms.contains_key(key) {
            return Some(ResolvedName {
                canonical: key.to_string(),
                score: 1.0,
                method: NameMatch::Exact,
            });
        }
        self.aliases.get(key).map(|canonical| ResolvedName {
            canonical: canonical.clone(),
            score: 1.0,
            method: NameMatch::Alias,
        })
    }

    /// Best candidate above `threshold`.
    ///
    /// Score: Jaro-Winkler 60% + normalized Levenshtein 40%. Names shorter
    /// than four characters are never fuzzy-matched.
    fn fuzzy_match(&self, name: &str, threshold: f64) -> Option<ResolvedName> {
        if name.chars().count() < 4 {
            return None;
        }

        let candidates = self
            .mechanisms
            .keys()
            .map(|k| (k.as_str(), k.as_str()))
            .chain(
                self.aliases
                    .iter()
                    .filter(|(alias, _)| alias.chars().count() >= 4)
                    .map(|(alias, canonical)| (alias.as_str(), canonical.as_str())),
            );

        let mut best: Option<(f64, &str)> = None;
        for (candidate, canonical) in candidates {
            let score = jaro_winkler(name, candidate) * 0.6 + normalized_levenshtein(name, candidate) * 0.4;
            let better = match best {
                None => true,
                Some((best_score, best_name)) => {
                    score > best_score || (score == best_score && canonical < best_name)
                }
            };
            if better {
                best = Some((score, canonical));
            }
        }

        best.filter(|(score, _)| *score >= threshold)
            .map(|(score, canonical)| ResolvedName {
                canonical: canonical.to_string(),
                score,
                method: NameMatch::Fuzzy,
            })
    }

    /// Hepatic-metabolism tier, clinical significance and contraindications.
    pub fn hepatic_profile(&self, name: &str) -> HepaticProfile {
        let Some(mechanism) = self.mechanism_for(name) else {
            return HepaticProfile {
                drug: name.to_string(),
                hepatic_metabolism_pct: None,
                tier: HepaticTier::Unknown,
                principle: "Insufficient data available".into(),
                clinical_significance: "Unknown - consult additional references".into(),
                contraindications: Vec::new(),
            };
        };

        let pct = mechanism.hepatic_metabolism_pct.unwrap_or(0.0);
        let (tier, principle, significance) = if pct >= 75.0 {
            (
                HepaticTier::High,
                "High hepatic metabolism dependency - primarily eliminated by liver enzymes",
                "Significant dose reduction required in hepatic impairment to prevent accumulation and toxicity",
            )
        } else if pct >= 50.0 {
            (
                HepaticTier::Moderate,
                "Moderate hepatic metabolism dependency - partially eliminated by liver",
                "Moderate dose adjustment may be needed in hepatic impairment",
            )
        } else if pct >= 25.0 {
            (
                HepaticTier::Low,
                "Low hepatic metabolism dependency - minimally affected by liver function",
                "Minor dose adjustment may be sufficient in hepatic impairment",
            )
        } else {
            (
                HepaticTier::Minimal,
                "Minimal hepatic metabolism - primarily eliminated by other routes",
                "Hepatic impairment unlikely to significantly affect dosing",
            )
        };

        HepaticProfile {
            drug: name.to_string(),
            hepatic_metabolism_pct: Some(pct),
            tier,
            principle: principle.into(),
            clinical_significance: significance.into(),
            contraindications: mechanism.contraindications.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_contents() {
        let registry = DrugRegistry::builtin();
        assert!(registry.len() >= 45);
        for name in ["phenobarbital", "diazepam", "theophylline", "warfarin", "digoxin", "dexmedetomidine"] {
            assert!(registry.contains(name), "missing {}", name);
        }
        // every alias points at a real entry
        for alias in registry.alias_names() {
            let resolved = registry.resolve(alias).unwrap();
            assert!(registry.contains(&resolved.canonical), "dangling alias {}", alias);
        }
    }

    #[test]
    fn test_shared_is_single_instance() {
        let a = DrugRegistry::shared();
        let b = DrugRegistry::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_resolve_exact_alias_and_suffix() {
        let registry = DrugRegistry::builtin();

        let exact = registry.resolve("  Phenobarbital ").unwrap();
        assert_eq!(exact.canonical, "phenobarbital");
        assert_eq!(exact.method, NameMatch::Exact);

        let alias = registry.resolve("Clavamox").unwrap();
        assert_eq!(alias.canonical, "amoxicillin");
        assert_eq!(alias.method, NameMatch::Alias);

        let suffixed = registry.resolve("carprofen_tablet").unwrap();
        assert_eq!(suffixed.canonical, "carprofen");

        let dosed = registry.resolve("Rimadyl 100mg tablets").unwrap();
        assert_eq!(dosed.canonical, "carprofen");
    }

    #[test]
    fn test_resolve_fuzzy() {
        let registry = DrugRegistry::builtin();

        let typo = registry.resolve("phenobarbitol").unwrap();
        assert_eq!(typo.canonical, "phenobarbital");
        assert_eq!(typo.method, NameMatch::Fuzzy);
        assert!(typo.score < 1.0);

        assert!(registry.resolve("UnlistedDrugX").is_none());
        assert!(registry.resolve("").is_none());
        assert!(registry.resolve("xyz").is_none());
    }

    #[test]
    fn test_hepatic_profile_tiers() {
        let registry = DrugRegistry::builtin();

        let high = registry.hepatic_profile("phenobarbital");
        assert_eq!(high.tier, HepaticTier::High);
        assert_eq!(high.hepatic_metabolism_pct, Some(75.0));
        assert!(high.contraindications.contains(&"severe_liver_disease".to_string()));

        assert_eq!(registry.hepatic_profile("ciprofloxacin").tier, HepaticTier::Moderate);
        assert_eq!(registry.hepatic_profile("doxycycline").tier, HepaticTier::Low);
        assert_eq!(registry.hepatic_profile("gabapentin").tier, HepaticTier::Minimal);

        let unknown = registry.hepatic_profile("UnlistedDrugX");
        assert_eq!(unknown.tier, HepaticTier::Unknown);
        assert!(unknown.hepatic_metabolism_pct.is_none());
    }
}
