//! Patient-condition rules.

use crate::models::{DrugInteraction, DrugMechanism, InteractionSource, InteractionType, Partner, Severity};

/// Condition tags that indicate impaired hepatic clearance.
pub const HEPATIC_CONDITIONS: &[&str] = &[
    "liver_disease",
    "severe_liver_disease",
    "hepatic_compromise",
    "hepatic_impairment",
    "elevated_liver_enzymes",
];

const CONTRAINDICATION_CONFIDENCE: f64 = 0.9;
const HEPATIC_CONFIDENCE: f64 = 0.8;

fn humanize(tag: &str) -> String {
    tag.replace('_', " ")
}

/// One `Contraindicated` interaction per matching condition.
pub fn contraindications(mechanism: &DrugMechanism, conditions: &[String]) -> Vec<DrugInteraction> {
    conditions
        .iter()
        .filter_map(|condition| {
            let tag = mechanism.contraindicated_for(condition)?;
            Some(DrugInteraction {
                drug: mechanism.name.clone(),
                partner: Partner::Condition(condition.clone()),
                interaction_type: InteractionType::Contraindicated,
                severity: Severity::Contraindicated,
                mechanism: format!(
                    "{} is contraindicated with {}",
                    mechanism.name,
                    humanize(tag)
                ),
                clinical_effect: format!(
                    "Use in a patient with {} risks serious adverse effects",
                    humanize(condition)
                ),
                management: format!("Avoid {}; select an alternative agent", mechanism.name),
                confidence: CONTRAINDICATION_CONFIDENCE,
                source: InteractionSource::Condition("contraindication".into()),
            })
        })
        .collect()
}

pub fn has_hepatic_condition(conditions: &[String]) -> bool {
    conditions
        .iter()
        .any(|c| HEPATIC_CONDITIONS.contains(&c.as_str()))
}

/// Two drugs that both depend heavily on the liver, given in hepatic impairment.
pub fn hepatic_concern(
    a: &DrugMechanism,
    b: &DrugMechanism,
    conditions: &[String],
) -> Option<DrugInteraction> {
    let heavy = |m: &DrugMechanism| m.hepatic_metabolism_pct.map_or(false, |p| p > 70.0);
    if !(heavy(a) && heavy(b) && has_hepatic_condition(conditions)) {
        return None;
    }

    Some(DrugInteraction {
        drug: a.name.clone(),
        partner: Partner::Drug(b.name.clone()),
        interaction_type: InteractionType::HepaticMetabolism,
        severity: Severity::Major,
        mechanism: "High hepatic metabolism dependency of both drugs".into(),
        clinical_effect: "Reduced clearance and accumulation in hepatic impairment".into(),
        management: "Dose reduction needed in liver disease, monitor liver values".into(),
        confidence: HEPATIC_CONFIDENCE,
        source: InteractionSource::Condition("hepatic_compromise_concern".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DrugRegistry;

    #[test]
    fn test_contraindication_suffix_match() {
        let registry = DrugRegistry::builtin();
        let pheno = registry.get("phenobarbital").unwrap();

        let hits = contraindications(pheno, &["liver_disease".into(), "kidney_disease".into()]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].partner, Partner::Condition("liver_disease".into()));
        assert_eq!(hits[0].severity, Severity::Contraindicated);
    }

    #[test]
    fn test_species_contraindication() {
        let registry = DrugRegistry::builtin();
        let carprofen = registry.get("carprofen").unwrap();
        assert_eq!(contraindications(carprofen, &["feline".into()]).len(), 1);
        assert!(contraindications(carprofen, &["canine".into()]).is_empty());
    }

    #[test]
    fn test_hepatic_concern_needs_condition() {
        let registry = DrugRegistry::builtin();
        let pheno = registry.get("phenobarbital").unwrap();
        let diazepam = registry.get("diazepam").unwrap();
        let amoxicillin = registry.get("amoxicillin").unwrap();

        assert!(hepatic_concern(pheno, diazepam, &[]).is_none());
        assert!(hepatic_concern(pheno, diazepam, &["hepatic_compromise".into()]).is_some());
        assert!(hepatic_concern(pheno, amoxicillin, &["liver_disease".into()]).is_none());
    }
}
