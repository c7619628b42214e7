//! Pharmacological mechanism models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role a drug plays for a cytochrome P450 enzyme.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CypRole {
    Inducer,
    Inhibitor,
    /// Clinically weak inhibition; does not trigger inhibition rules
    WeakInhibitor,
    Substrate,
}

impl CypRole {
    pub fn label(&self) -> &'static str {
        match self {
            CypRole::Inducer => "inducer",
            CypRole::Inhibitor => "inhibitor",
            CypRole::WeakInhibitor => "weak inhibitor",
            CypRole::Substrate => "substrate",
        }
    }
}

/// Therapeutic class of a drug.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TherapeuticClass {
    Anticonvulsant,
    AnticonvulsantAnalgesic,
    Barbiturate,
    Benzodiazepine,
    Phenothiazine,
    Alpha2Agonist,
    GeneralAnesthetic,
    LocalAnesthetic,
    NmdaAntagonist,
    OpioidAnalgesic,
    PartialOpioidAgonist,
    Nsaid,
    Cox2Nsaid,
    BetaLactamAntibiotic,
    BetaLactamaseInhibitor,
    Antibiotic,
    Cephalosporin,
    Fluoroquinolone,
    Macrolide,
    Nitroimidazole,
    Tetracycline,
    Antifungal,
    AceInhibitor,
    BetaBlocker,
    CalciumChannelBlocker,
    CardiacGlycoside,
    Catecholamine,
    Inodilator,
    LoopDiuretic,
    Methylxanthine,
    Anticoagulant,
    Ssri,
    MaoInhibitor,
}

impl TherapeuticClass {
    pub fn label(&self) -> &'static str {
        match self {
            TherapeuticClass::Anticonvulsant => "anticonvulsant",
            TherapeuticClass::AnticonvulsantAnalgesic => "anticonvulsant/analgesic",
            TherapeuticClass::Barbiturate => "barbiturate",
            TherapeuticClass::Benzodiazepine => "benzodiazepine",
            TherapeuticClass::Phenothiazine => "phenothiazine",
            TherapeuticClass::Alpha2Agonist => "alpha-2 agonist",
            TherapeuticClass::GeneralAnesthetic => "general anesthetic",
            TherapeuticClass::LocalAnesthetic => "local anesthetic",
            TherapeuticClass::NmdaAntagonist => "NMDA antagonist",
            TherapeuticClass::OpioidAnalgesic => "opioid analgesic",
            TherapeuticClass::PartialOpioidAgonist => "partial opioid agonist",
            TherapeuticClass::Nsaid => "NSAID",
            TherapeuticClass::Cox2Nsaid => "COX-2 selective NSAID",
            TherapeuticClass::BetaLactamAntibiotic => "beta-lactam antibiotic",
            TherapeuticClass::BetaLactamaseInhibitor => "beta-lactamase inhibitor",
            TherapeuticClass::Antibiotic => "antibiotic",
            TherapeuticClass::Cephalosporin => "cephalosporin",
            TherapeuticClass::Fluoroquinolone => "fluoroquinolone",
            TherapeuticClass::Macrolide => "macrolide",
            TherapeuticClass::Nitroimidazole => "nitroimidazole",
            TherapeuticClass::Tetracycline => "tetracycline",
            TherapeuticClass::Antifungal => "azole antifungal",
            TherapeuticClass::AceInhibitor => "ACE inhibitor",
            TherapeuticClass::BetaBlocker => "beta blocker",
            TherapeuticClass::CalciumChannelBlocker => "calcium channel blocker",
            TherapeuticClass::CardiacGlycoside => "cardiac glycoside",
            TherapeuticClass::Catecholamine => "catecholamine",
            TherapeuticClass::Inodilator => "inodilator",
            TherapeuticClass::LoopDiuretic => "loop diuretic",
            TherapeuticClass::Methylxanthine => "methylxanthine",
            TherapeuticClass::Anticoagulant => "anticoagulant",
            TherapeuticClass::Ssri => "SSRI",
            TherapeuticClass::MaoInhibitor => "MAO inhibitor",
        }
    }

    /// Broad anti-inflammatory (COX-inhibiting) class.
    pub fn is_nsaid(&self) -> bool {
        matches!(self, TherapeuticClass::Nsaid | TherapeuticClass::Cox2Nsaid)
    }

    pub fn is_opioid(&self) -> bool {
        matches!(
            self,
            TherapeuticClass::OpioidAnalgesic | TherapeuticClass::PartialOpioidAgonist
        )
    }

    /// Sedative or anesthetic classes that add to opioid CNS depression.
    pub fn is_cns_depressant(&self) -> bool {
        matches!(
            self,
            TherapeuticClass::Benzodiazepine
                | TherapeuticClass::Phenothiazine
                | TherapeuticClass::GeneralAnesthetic
                | TherapeuticClass::Alpha2Agonist
                | TherapeuticClass::Barbiturate
        )
    }

    pub fn is_serotonergic(&self) -> bool {
        matches!(self, TherapeuticClass::Ssri | TherapeuticClass::MaoInhibitor)
    }
}

impl fmt::Display for TherapeuticClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Static pharmacological attributes of a drug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugMechanism {
    /// Canonical lowercase name
    pub name: String,
    /// CYP450 roles (apply to every listed enzyme)
    pub cyp_roles: Vec<CypRole>,
    /// CYP450 enzyme identifiers (e.g. "3A4", "2C9")
    pub cyp_enzymes: Vec<String>,
    /// Percent hepatic metabolism
    pub hepatic_metabolism_pct: Option<f64>,
    /// Percent renal elimination
    pub renal_elimination_pct: Option<f64>,
    /// Percent plasma protein binding
    pub protein_binding_pct: Option<f64>,
    /// Therapeutic class
    pub therapeutic_class: TherapeuticClass,
    /// Contraindication tags (e.g. "severe_liver_disease")
    pub contraindications: Vec<String>,
}

impl DrugMechanism {
    pub fn has_role(&self, role: CypRole) -> bool {
        self.cyp_roles.contains(&role)
    }

    /// Enzymes listed by both drugs, sorted.
    pub fn shared_enzymes(&self, other: &DrugMechanism) -> Vec<String> {
        let mut shared: Vec<String> = self
            .cyp_enzymes
            .iter()
            .filter(|e| other.cyp_enzymes.contains(e))
            .cloned()
            .collect();
        shared.sort();
        shared
    }

    pub fn metabolizes_via(&self, enzyme: &str) -> bool {
        self.has_role(CypRole::Substrate) && self.cyp_enzymes.iter().any(|e| e == enzyme)
    }

    /// Whether a contraindication tag matches a patient condition.
    ///
    /// `severe_liver_disease` matches the condition `liver_disease`.
    pub fn contraindicated_for(&self, condition: &str) -> Option<&str> {
        let condition = condition.to_lowercase();
        let suffix = format!("_{}", condition);
        self.contraindications
            .iter()
            .find(|tag| **tag == condition || tag.ends_with(&suffix))
            .map(|tag| tag.as_str())
    }
}
