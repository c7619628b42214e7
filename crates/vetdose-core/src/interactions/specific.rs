//! Curated, documented interactions.
//!
//! These name specific agents and carry higher confidence than the general
//! rules. For a drug pair, a curated hit replaces any general hit of the
//! same interaction type.

use crate::models::{
    CypRole, DrugInteraction, DrugMechanism, InteractionSource, InteractionType, Partner, Severity,
};

type CuratedCheck = fn(&DrugMechanism, &DrugMechanism) -> Option<DrugInteraction>;

/// Every curated check. Each is tried in both orientations.
pub const CURATED_CHECKS: &[(&str, CuratedCheck)] = &[
    ("phenobarbital_induction", phenobarbital_induction),
    ("chloramphenicol_inhibition", chloramphenicol_inhibition),
    ("azole_cyp3a4_inhibition", azole_cyp3a4_inhibition),
    ("enrofloxacin_theophylline", enrofloxacin_theophylline),
    ("tramadol_serotonergic", tramadol_serotonergic),
    ("furosemide_digoxin", furosemide_digoxin),
    ("metronidazole_warfarin", metronidazole_warfarin),
    ("nsaid_ace_inhibitor", nsaid_ace_inhibitor),
];

/// Run all curated checks over an unordered pair.
pub fn curated_interactions(a: &DrugMechanism, b: &DrugMechanism) -> Vec<DrugInteraction> {
    let mut found = Vec::new();
    for (_, check) in CURATED_CHECKS {
        if let Some(hit) = check(a, b).or_else(|| check(b, a)) {
            found.push(hit);
        }
    }
    found
}

#[allow(clippy::too_many_arguments)]
fn curated(
    rule: &str,
    perpetrator: &str,
    affected: &str,
    interaction_type: InteractionType,
    severity: Severity,
    confidence: f64,
    mechanism: String,
    clinical_effect: String,
    management: String,
) -> DrugInteraction {
    DrugInteraction {
        drug: perpetrator.to_string(),
        partner: Partner::Drug(affected.to_string()),
        interaction_type,
        severity,
        mechanism,
        clinical_effect,
        management,
        confidence,
        source: InteractionSource::Curated(rule.to_string()),
    }
}

fn title(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn phenobarbital_induction(a: &DrugMechanism, b: &DrugMechanism) -> Option<DrugInteraction> {
    if a.name != "phenobarbital" || !b.has_role(CypRole::Substrate) {
        return None;
    }
    Some(curated(
        "phenobarbital_induction",
        &a.name,
        &b.name,
        InteractionType::EnzymeInduction,
        Severity::Moderate,
        0.9,
        "Phenobarbital strongly induces CYP450 enzymes, increasing metabolism of substrate drugs".into(),
        format!("Decreased {} plasma concentration and therapeutic effect", b.name),
        format!("Monitor {} therapeutic response, may need dose increase", b.name),
    ))
}

fn chloramphenicol_inhibition(a: &DrugMechanism, b: &DrugMechanism) -> Option<DrugInteraction> {
    if a.name != "chloramphenicol" || !b.has_role(CypRole::Substrate) {
        return None;
    }
    Some(curated(
        "chloramphenicol_inhibition",
        &a.name,
        &b.name,
        InteractionType::EnzymeInhibition,
        Severity::Major,
        0.95,
        "Chloramphenicol inhibits CYP450 enzymes, decreasing metabolism of substrate drugs".into(),
        format!("Increased {} plasma concentration and risk of toxicity", b.name),
        format!("Reduce {} dose, monitor for toxicity signs", b.name),
    ))
}

fn azole_cyp3a4_inhibition(a: &DrugMechanism, b: &DrugMechanism) -> Option<DrugInteraction> {
    if !matches!(a.name.as_str(), "ketoconazole" | "itraconazole") || !b.metabolizes_via("3A4") {
        return None;
    }
    Some(curated(
        "azole_cyp3a4_inhibition",
        &a.name,
        &b.name,
        InteractionType::EnzymeInhibition,
        Severity::Major,
        0.95,
        format!("{} potently inhibits CYP3A4, severely reducing {} metabolism", title(&a.name), b.name),
        format!("2-10 fold increase in {} concentration, high toxicity risk", b.name),
        format!("Reduce {} dose by 75% or avoid combination", b.name),
    ))
}

fn enrofloxacin_theophylline(a: &DrugMechanism, b: &DrugMechanism) -> Option<DrugInteraction> {
    if a.name != "enrofloxacin" || b.name != "theophylline" {
        return None;
    }
    Some(curated(
        "enrofloxacin_theophylline",
        &a.name,
        &b.name,
        InteractionType::EnzymeInhibition,
        Severity::Major,
        0.95,
        "Enrofloxacin inhibits CYP1A2, reducing theophylline metabolism".into(),
        "Theophylline toxicity: seizures, arrhythmias, gastrointestinal upset".into(),
        "Reduce theophylline dose by 50%, monitor plasma levels".into(),
    ))
}

fn tramadol_serotonergic(a: &DrugMechanism, b: &DrugMechanism) -> Option<DrugInteraction> {
    if a.name != "tramadol" || !b.therapeutic_class.is_serotonergic() {
        return None;
    }
    Some(curated(
        "tramadol_serotonergic",
        &a.name,
        &b.name,
        InteractionType::Pharmacodynamic,
        Severity::Major,
        0.9,
        "Tramadol increases serotonin, MAOIs/SSRIs block serotonin reuptake".into(),
        "Serotonin syndrome: hyperthermia, agitation, muscle rigidity".into(),
        "AVOID combination or use extreme caution with monitoring".into(),
    ))
}

fn furosemide_digoxin(a: &DrugMechanism, b: &DrugMechanism) -> Option<DrugInteraction> {
    if a.name != "furosemide" || b.name != "digoxin" {
        return None;
    }
    Some(curated(
        "furosemide_digoxin",
        &a.name,
        &b.name,
        InteractionType::Pharmacodynamic,
        Severity::Moderate,
        0.85,
        "Furosemide-induced hypokalemia increases digoxin sensitivity".into(),
        "Enhanced digoxin effects, risk of cardiac arrhythmias".into(),
        "Monitor potassium levels, supplement potassium as needed".into(),
    ))
}

fn metronidazole_warfarin(a: &DrugMechanism, b: &DrugMechanism) -> Option<DrugInteraction> {
    if a.name != "metronidazole" || b.name != "warfarin" {
        return None;
    }
    Some(curated(
        "metronidazole_warfarin",
        &a.name,
        &b.name,
        InteractionType::EnzymeInhibition,
        Severity::Major,
        0.9,
        "Metronidazole inhibits CYP2C9, reducing warfarin metabolism".into(),
        "Enhanced anticoagulation, increased bleeding risk".into(),
        "Reduce warfarin dose, monitor coagulation times closely".into(),
    ))
}

fn nsaid_ace_inhibitor(a: &DrugMechanism, b: &DrugMechanism) -> Option<DrugInteraction> {
    let nsaid = matches!(a.name.as_str(), "carprofen" | "meloxicam" | "firocoxib");
    let ace = matches!(b.name.as_str(), "enalapril" | "benazepril");
    if !(nsaid && ace) {
        return None;
    }
    Some(curated(
        "nsaid_ace_inhibitor",
        &a.name,
        &b.name,
        InteractionType::Pharmacodynamic,
        Severity::Moderate,
        0.85,
        "NSAIDs reduce prostaglandin-mediated renal protection by ACE inhibitors".into(),
        "Reduced renal function, potential acute kidney injury".into(),
        "Monitor renal function closely, ensure adequate hydration".into(),
    ))
}
