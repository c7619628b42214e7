//! Drug interaction models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mechanism category of an interaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    EnzymeInduction,
    EnzymeInhibition,
    HepaticMetabolism,
    RenalElimination,
    ProteinBinding,
    Pharmacodynamic,
    Contraindicated,
}

impl InteractionType {
    pub fn label(&self) -> &'static str {
        match self {
            InteractionType::EnzymeInduction => "enzyme induction",
            InteractionType::EnzymeInhibition => "enzyme inhibition",
            InteractionType::HepaticMetabolism => "hepatic metabolism",
            InteractionType::RenalElimination => "renal elimination",
            InteractionType::ProteinBinding => "protein binding",
            InteractionType::Pharmacodynamic => "pharmacodynamic",
            InteractionType::Contraindicated => "contraindication",
        }
    }
}

/// Clinical severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
    Contraindicated,
}

impl Severity {
    /// Most severe first.
    pub const DESCENDING: [Severity; 4] = [
        Severity::Contraindicated,
        Severity::Major,
        Severity::Moderate,
        Severity::Minor,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Major => "major",
            Severity::Contraindicated => "contraindicated",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The other side of an interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Partner {
    /// Another co-administered drug
    Drug(String),
    /// A patient condition the drug is contraindicated for
    Condition(String),
}

impl Partner {
    pub fn name(&self) -> &str {
        match self {
            Partner::Drug(name) | Partner::Condition(name) => name,
        }
    }
}

impl fmt::Display for Partner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partner::Drug(name) => f.write_str(name),
            Partner::Condition(name) => write!(f, "condition: {}", name.replace('_', " ")),
        }
    }
}

/// Which part of the rule engine produced an interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "origin", content = "rule", rename_all = "snake_case")]
pub enum InteractionSource {
    /// Generalized mechanism rule
    MechanismRule(String),
    /// Curated, documented interaction
    Curated(String),
    /// Patient-condition rule
    Condition(String),
    /// One or both drugs have no registry entry
    InsufficientData,
}

/// A detected drug interaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugInteraction {
    /// Perpetrator drug (inducer/inhibitor where directional)
    pub drug: String,
    /// Affected drug or condition
    pub partner: Partner,
    /// Mechanism category
    pub interaction_type: InteractionType,
    /// Clinical severity
    pub severity: Severity,
    /// Mechanism description
    pub mechanism: String,
    /// Expected clinical effect
    pub clinical_effect: String,
    /// Management recommendation
    pub management: String,
    /// Confidence (0.0 - 1.0)
    pub confidence: f64,
    /// Producing rule
    pub source: InteractionSource,
}

impl DrugInteraction {
    pub fn involves(&self, drug: &str) -> bool {
        let drug = drug.to_lowercase();
        self.drug == drug || matches!(&self.partner, Partner::Drug(name) if *name == drug)
    }

    pub fn is_insufficient_data(&self) -> bool {
        matches!(self.source, InteractionSource::InsufficientData)
    }

    /// Unordered pair key for de-duplication.
    pub fn pair_key(&self) -> (String, String) {
        let other = self.partner.name().to_string();
        if self.drug <= other {
            (self.drug.clone(), other)
        } else {
            (other, self.drug.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Contraindicated > Severity::Major);
        assert!(Severity::Major > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Minor);
        assert_eq!(Severity::DESCENDING[0], Severity::Contraindicated);
    }

    #[test]
    fn test_pair_key_unordered() {
        let make = |a: &str, b: &str| DrugInteraction {
            drug: a.into(),
            partner: Partner::Drug(b.into()),
            interaction_type: InteractionType::Pharmacodynamic,
            severity: Severity::Minor,
            mechanism: String::new(),
            clinical_effect: String::new(),
            management: String::new(),
            confidence: 0.5,
            source: InteractionSource::InsufficientData,
        };

        assert_eq!(make("b", "a").pair_key(), make("a", "b").pair_key());
        assert!(make("a", "b").involves("B"));
        assert!(!make("a", "b").involves("c"));
    }
}
