//! General mechanism rules.
//!
//! Each rule is a pure, directional predicate over two resolved mechanisms:
//! `applies(perpetrator, affected)`. The engine tries both orientations.

use crate::models::{CypRole, DrugMechanism, InteractionType, Severity};

/// Confidence assigned to every general-rule hit.
pub const GENERAL_RULE_CONFIDENCE: f64 = 0.8;

/// A generalized interaction rule.
#[derive(Debug, Clone, Copy)]
pub struct MechanismRule {
    pub id: &'static str,
    pub interaction_type: InteractionType,
    pub severity: Severity,
    pub mechanism: &'static str,
    pub clinical_effect: &'static str,
    pub management: &'static str,
    pub applies: fn(&DrugMechanism, &DrugMechanism) -> bool,
}

impl MechanismRule {
    /// Returns true when `a` acts on `b`. Symmetric rules match either way.
    pub fn matches(&self, a: &DrugMechanism, b: &DrugMechanism) -> bool {
        (self.applies)(a, b)
    }
}

fn shares_enzyme(a: &DrugMechanism, b: &DrugMechanism) -> bool {
    a.cyp_enzymes.iter().any(|e| b.cyp_enzymes.contains(e))
}

fn both_above(a: Option<f64>, b: Option<f64>, threshold: f64) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x > threshold && y > threshold)
}

pub fn cyp_induction(a: &DrugMechanism, b: &DrugMechanism) -> bool {
    a.has_role(CypRole::Inducer) && b.has_role(CypRole::Substrate) && shares_enzyme(a, b)
}

/// Weak inhibitors deliberately do not match.
pub fn cyp_inhibition(a: &DrugMechanism, b: &DrugMechanism) -> bool {
    a.has_role(CypRole::Inhibitor) && b.has_role(CypRole::Substrate) && shares_enzyme(a, b)
}

pub fn protein_binding_displacement(a: &DrugMechanism, b: &DrugMechanism) -> bool {
    both_above(a.protein_binding_pct, b.protein_binding_pct, 95.0)
}

pub fn nsaid_combination(a: &DrugMechanism, b: &DrugMechanism) -> bool {
    a.therapeutic_class.is_nsaid() && b.therapeutic_class.is_nsaid()
}

pub fn opioid_cns_depression(a: &DrugMechanism, b: &DrugMechanism) -> bool {
    a.therapeutic_class.is_opioid() && b.therapeutic_class.is_cns_depressant()
}

pub fn ace_diuretic_hypotension(a: &DrugMechanism, b: &DrugMechanism) -> bool {
    use crate::models::TherapeuticClass::{AceInhibitor, LoopDiuretic};
    a.therapeutic_class == AceInhibitor && b.therapeutic_class == LoopDiuretic
}

pub fn fluoroquinolone_nsaid(a: &DrugMechanism, b: &DrugMechanism) -> bool {
    use crate::models::TherapeuticClass::Fluoroquinolone;
    a.therapeutic_class == Fluoroquinolone && b.therapeutic_class.is_nsaid()
}

pub fn renal_competition(a: &DrugMechanism, b: &DrugMechanism) -> bool {
    both_above(a.renal_elimination_pct, b.renal_elimination_pct, 80.0)
}

pub fn antifungal_inhibition(a: &DrugMechanism, b: &DrugMechanism) -> bool {
    use crate::models::TherapeuticClass::Antifungal;
    a.therapeutic_class == Antifungal && b.has_role(CypRole::Substrate) && shares_enzyme(a, b)
}

pub fn beta_lactam_synergy(a: &DrugMechanism, b: &DrugMechanism) -> bool {
    use crate::models::TherapeuticClass::{BetaLactamAntibiotic, BetaLactamaseInhibitor};
    a.therapeutic_class == BetaLactamAntibiotic && b.therapeutic_class == BetaLactamaseInhibitor
}

/// Every general rule, in evaluation order.
pub const GENERAL_RULES: &[MechanismRule] = &[
    MechanismRule {
        id: "cyp450_induction",
        interaction_type: InteractionType::EnzymeInduction,
        severity: Severity::Moderate,
        mechanism: "CYP450 enzyme induction increases metabolism of substrate drug",
        clinical_effect: "Decreased plasma concentration and efficacy of substrate drug",
        management: "Monitor therapeutic response, may need dose adjustment",
        applies: cyp_induction,
    },
    MechanismRule {
        id: "cyp450_inhibition",
        interaction_type: InteractionType::EnzymeInhibition,
        severity: Severity::Major,
        mechanism: "CYP450 enzyme inhibition decreases metabolism of substrate drug",
        clinical_effect: "Increased plasma concentration and potential toxicity of substrate drug",
        management: "Reduce substrate drug dose, monitor for toxicity",
        applies: cyp_inhibition,
    },
    MechanismRule {
        id: "protein_binding_displacement",
        interaction_type: InteractionType::ProteinBinding,
        severity: Severity::Moderate,
        mechanism: "Highly protein-bound drugs compete for binding sites",
        clinical_effect: "Displacement increases free drug concentration and activity",
        management: "Monitor for enhanced effects, consider dose reduction",
        applies: protein_binding_displacement,
    },
    MechanismRule {
        id: "nsaid_combination",
        interaction_type: InteractionType::Pharmacodynamic,
        severity: Severity::Major,
        mechanism: "Additive COX inhibition and GI/renal toxicity",
        clinical_effect: "Increased risk of GI ulceration, bleeding, and nephrotoxicity",
        management: "AVOID concurrent NSAID use - select single NSAID",
        applies: nsaid_combination,
    },
    MechanismRule {
        id: "opioid_cns_depression",
        interaction_type: InteractionType::Pharmacodynamic,
        severity: Severity::Major,
        mechanism: "Additive CNS and respiratory depression",
        clinical_effect: "Enhanced sedation, respiratory depression, hypotension",
        management: "Reduce doses of both drugs, monitor respiratory status closely",
        applies: opioid_cns_depression,
    },
    MechanismRule {
        id: "ace_diuretic_hypotension",
        interaction_type: InteractionType::Pharmacodynamic,
        severity: Severity::Moderate,
        mechanism: "Additive hypotensive effects",
        clinical_effect: "Enhanced blood pressure reduction, risk of hypotension",
        management: "Start with lower doses, monitor blood pressure closely",
        applies: ace_diuretic_hypotension,
    },
    MechanismRule {
        id: "fluoroquinolone_nsaid_seizure",
        interaction_type: InteractionType::Pharmacodynamic,
        severity: Severity::Moderate,
        mechanism: "GABA receptor antagonism increases seizure risk",
        clinical_effect: "Increased risk of CNS stimulation and seizures",
        management: "Use with caution, monitor for neurological signs",
        applies: fluoroquinolone_nsaid,
    },
    MechanismRule {
        id: "renal_elimination_competition",
        interaction_type: InteractionType::RenalElimination,
        severity: Severity::Moderate,
        mechanism: "Competition for renal elimination pathways",
        clinical_effect: "Potential for drug accumulation in renal impairment",
        management: "Dose adjustment required in kidney disease",
        applies: renal_competition,
    },
    MechanismRule {
        id: "antifungal_cyp450_inhibition",
        interaction_type: InteractionType::EnzymeInhibition,
        severity: Severity::Major,
        mechanism: "Potent antifungal CYP450 inhibition",
        clinical_effect: "Significant increase in substrate drug concentration",
        management: "Consider substrate dose reduction by 50-75%, monitor closely",
        applies: antifungal_inhibition,
    },
    MechanismRule {
        id: "beta_lactam_synergy",
        interaction_type: InteractionType::Pharmacodynamic,
        severity: Severity::Minor,
        mechanism: "Beta-lactamase inhibition enhances antibiotic efficacy",
        clinical_effect: "Improved antimicrobial spectrum and effectiveness",
        management: "Beneficial interaction - continue combination",
        applies: beta_lactam_synergy,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DrugRegistry;

    fn mech(name: &str) -> DrugMechanism {
        DrugRegistry::builtin().get(name).cloned().unwrap()
    }

    #[test]
    fn test_induction_is_directional() {
        let pheno = mech("phenobarbital");
        let diazepam = mech("diazepam");
        assert!(cyp_induction(&pheno, &diazepam));
        assert!(!cyp_induction(&diazepam, &pheno));
    }

    #[test]
    fn test_weak_inhibitor_ignored() {
        let azithro = mech("azithromycin");
        let fentanyl = mech("fentanyl");
        assert!(!cyp_inhibition(&azithro, &fentanyl));

        let keto = mech("ketoconazole");
        assert!(cyp_inhibition(&keto, &fentanyl));
        assert!(antifungal_inhibition(&keto, &fentanyl));
    }

    #[test]
    fn test_threshold_rules_are_strict() {
        // diazepam is exactly 95% bound
        assert!(!protein_binding_displacement(&mech("diazepam"), &mech("carprofen")));
        assert!(protein_binding_displacement(&mech("meloxicam"), &mech("carprofen")));

        // digoxin is exactly 80% renal
        assert!(!renal_competition(&mech("digoxin"), &mech("gabapentin")));
        assert!(renal_competition(&mech("amoxicillin"), &mech("gabapentin")));
    }

    #[test]
    fn test_class_rules() {
        assert!(nsaid_combination(&mech("carprofen"), &mech("firocoxib")));
        assert!(opioid_cns_depression(&mech("morphine"), &mech("acepromazine")));
        assert!(!opioid_cns_depression(&mech("acepromazine"), &mech("morphine")));
        assert!(ace_diuretic_hypotension(&mech("enalapril"), &mech("furosemide")));
        assert!(fluoroquinolone_nsaid(&mech("enrofloxacin"), &mech("meloxicam")));
        assert!(beta_lactam_synergy(&mech("amoxicillin"), &mech("clavulanate")));
    }

    #[test]
    fn test_rule_ids_unique() {
        let mut ids: Vec<&str> = GENERAL_RULES.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), GENERAL_RULES.len());
    }
}
