//! Built-in pharmacology table.

use std::collections::HashMap;

use crate::models::{CypRole, DrugMechanism, TherapeuticClass};

use CypRole::{Inducer, Inhibitor, Substrate, WeakInhibitor};
use TherapeuticClass as C;

#[allow(clippy::too_many_arguments)]
fn drug(
    name: &str,
    roles: &[CypRole],
    enzymes: &[&str],
    hepatic: f64,
    renal: f64,
    protein_binding: f64,
    class: TherapeuticClass,
    contraindications: &[&str],
) -> DrugMechanism {
    DrugMechanism {
        name: name.to_string(),
        cyp_roles: roles.to_vec(),
        cyp_enzymes: enzymes.iter().map(|e| e.to_string()).collect(),
        hepatic_metabolism_pct: Some(hepatic),
        renal_elimination_pct: Some(renal),
        protein_binding_pct: Some(protein_binding),
        therapeutic_class: class,
        contraindications: contraindications.iter().map(|c| c.to_string()).collect(),
    }
}

/// Every drug the engine has mechanism data for.
pub(super) fn builtin_mechanisms() -> Vec<DrugMechanism> {
    vec![
        // CNS
        drug("phenobarbital", &[Inducer], &["3A4", "2C9", "2C19", "2B6"], 75.0, 25.0, 50.0, C::Anticonvulsant, &["severe_liver_disease", "porphyria"]),
        drug("pentobarbital", &[Inducer], &["3A4", "2C9"], 85.0, 15.0, 45.0, C::Barbiturate, &["severe_liver_disease", "respiratory_depression"]),
        drug("diazepam", &[Substrate], &["3A4", "2C19"], 95.0, 5.0, 95.0, C::Benzodiazepine, &["severe_liver_disease"]),
        drug("levetiracetam", &[], &[], 24.0, 66.0, 10.0, C::Anticonvulsant, &["severe_kidney_disease"]),
        drug("zonisamide", &[Substrate], &["3A4"], 85.0, 15.0, 40.0, C::Anticonvulsant, &["sulfonamide_allergy"]),
        drug("gabapentin", &[], &[], 0.0, 100.0, 3.0, C::AnticonvulsantAnalgesic, &["severe_kidney_disease"]),
        drug("pregabalin", &[], &[], 0.0, 100.0, 0.0, C::AnticonvulsantAnalgesic, &["severe_kidney_disease"]),
        // Sedatives and anesthetics
        drug("acepromazine", &[Substrate], &["3A4"], 95.0, 5.0, 90.0, C::Phenothiazine, &["hypotension", "seizure_disorder"]),
        drug("dexmedetomidine", &[Substrate], &["2A6"], 95.0, 5.0, 94.0, C::Alpha2Agonist, &["severe_cardiac_disease", "shock"]),
        drug("propofol", &[Substrate], &["2B6", "2C9"], 88.0, 2.0, 98.0, C::GeneralAnesthetic, &["severe_cardiac_disease"]),
        drug("ketamine", &[Substrate], &["3A4", "2B6"], 90.0, 10.0, 12.0, C::NmdaAntagonist, &["increased_intracranial_pressure"]),
        drug("lidocaine", &[Substrate], &["3A4", "1A2"], 95.0, 5.0, 70.0, C::LocalAnesthetic, &["heart_block", "severe_liver_disease"]),
        drug("bupivacaine", &[Substrate], &["3A4"], 95.0, 5.0, 95.0, C::LocalAnesthetic, &["heart_block", "severe_liver_disease"]),
        // Opioids
        drug("morphine", &[Substrate], &["2D6"], 85.0, 15.0, 35.0, C::OpioidAnalgesic, &["respiratory_depression"]),
        drug("fentanyl", &[Substrate], &["3A4"], 95.0, 5.0, 84.0, C::OpioidAnalgesic, &["respiratory_depression", "severe_liver_disease"]),
        drug("tramadol", &[Substrate], &["2D6", "3A4"], 90.0, 10.0, 20.0, C::OpioidAnalgesic, &["seizure_disorder"]),
        drug("butorphanol", &[Substrate], &["3A4"], 85.0, 15.0, 80.0, C::OpioidAnalgesic, &["severe_liver_disease"]),
        drug("buprenorphine", &[Substrate], &["3A4"], 95.0, 5.0, 96.0, C::PartialOpioidAgonist, &["severe_liver_disease"]),
        // NSAIDs
        drug("carprofen", &[Substrate], &["2C9"], 95.0, 5.0, 99.0, C::Nsaid, &["feline", "kidney_disease", "liver_disease", "bleeding_disorders"]),
        drug("meloxicam", &[Substrate], &["2C9"], 95.0, 5.0, 99.0, C::Nsaid, &["kidney_disease", "liver_disease", "dehydration"]),
        drug("firocoxib", &[Substrate], &["2C9", "3A4"], 90.0, 10.0, 96.0, C::Cox2Nsaid, &["kidney_disease", "liver_disease"]),
        // Antimicrobials
        drug("amoxicillin", &[], &[], 10.0, 90.0, 20.0, C::BetaLactamAntibiotic, &["penicillin_allergy"]),
        drug("clavulanate", &[], &[], 30.0, 70.0, 25.0, C::BetaLactamaseInhibitor, &["penicillin_allergy"]),
        drug("cephalexin", &[], &[], 10.0, 90.0, 15.0, C::Cephalosporin, &["penicillin_allergy"]),
        drug("chloramphenicol", &[Inhibitor], &["3A4", "2C9"], 90.0, 10.0, 60.0, C::Antibiotic, &["bone_marrow_suppression"]),
        drug("doxycycline", &[], &[], 30.0, 40.0, 90.0, C::Tetracycline, &["pregnancy", "young_animals"]),
        drug("enrofloxacin", &[Inhibitor], &["1A2"], 70.0, 30.0, 40.0, C::Fluoroquinolone, &["cartilage_disorders", "young_animals"]),
        drug("ciprofloxacin", &[Inhibitor], &["1A2"], 50.0, 50.0, 40.0, C::Fluoroquinolone, &["cartilage_disorders", "young_animals"]),
        drug("metronidazole", &[Inhibitor], &["2C9"], 80.0, 20.0, 10.0, C::Nitroimidazole, &["severe_liver_disease", "neurological_disorders"]),
        drug("azithromycin", &[WeakInhibitor], &["3A4"], 50.0, 12.0, 50.0, C::Macrolide, &["severe_liver_disease"]),
        // Antifungals
        drug("ketoconazole", &[Inhibitor], &["3A4"], 95.0, 5.0, 84.0, C::Antifungal, &["liver_disease"]),
        drug("itraconazole", &[Inhibitor], &["3A4"], 95.0, 5.0, 99.0, C::Antifungal, &["liver_disease", "heart_failure"]),
        drug("fluconazole", &[Inhibitor], &["2C9", "2C19"], 80.0, 20.0, 12.0, C::Antifungal, &["liver_disease"]),
        drug("voriconazole", &[Inhibitor, Substrate], &["2C19", "2C9", "3A4"], 95.0, 5.0, 58.0, C::Antifungal, &["liver_disease"]),
        drug("terbinafine", &[Inhibitor], &["2D6"], 85.0, 15.0, 99.0, C::Antifungal, &["liver_disease"]),
        // Cardiovascular
        drug("enalapril", &[], &[], 50.0, 50.0, 50.0, C::AceInhibitor, &["pregnancy", "bilateral_renal_artery_stenosis"]),
        drug("benazepril", &[], &[], 50.0, 50.0, 95.0, C::AceInhibitor, &["pregnancy", "bilateral_renal_artery_stenosis"]),
        drug("pimobendan", &[Substrate], &["3A4"], 85.0, 15.0, 95.0, C::Inodilator, &["hypertrophic_cardiomyopathy"]),
        drug("furosemide", &[], &[], 10.0, 90.0, 95.0, C::LoopDiuretic, &["anuria", "severe_electrolyte_imbalance"]),
        drug("diltiazem", &[Inhibitor, Substrate], &["3A4"], 90.0, 10.0, 80.0, C::CalciumChannelBlocker, &["heart_block", "severe_hypotension"]),
        drug("atenolol", &[], &[], 10.0, 90.0, 5.0, C::BetaBlocker, &["asthma", "severe_bradycardia"]),
        drug("digoxin", &[], &[], 20.0, 80.0, 25.0, C::CardiacGlycoside, &["ventricular_fibrillation", "hypokalemia"]),
        drug("warfarin", &[Substrate], &["2C9"], 95.0, 5.0, 99.0, C::Anticoagulant, &["bleeding_disorders", "liver_disease"]),
        drug("theophylline", &[Substrate], &["1A2"], 90.0, 10.0, 40.0, C::Methylxanthine, &["cardiac_arrhythmia", "seizure_disorder"]),
        // Critical care
        drug("dopamine", &[Substrate], &["2D6"], 75.0, 25.0, 0.0, C::Catecholamine, &["pheochromocytoma", "ventricular_fibrillation"]),
        drug("dobutamine", &[Substrate], &["2D6"], 85.0, 15.0, 0.0, C::Catecholamine, &["hypertrophic_cardiomyopathy"]),
        drug("epinephrine", &[Substrate], &["2D6"], 90.0, 10.0, 0.0, C::Catecholamine, &["ventricular_fibrillation"]),
        // Behavioral
        drug("fluoxetine", &[Inhibitor, Substrate], &["2D6"], 95.0, 5.0, 94.0, C::Ssri, &["seizure_disorder"]),
        drug("sertraline", &[Substrate], &["2C19", "2D6"], 95.0, 5.0, 98.0, C::Ssri, &["seizure_disorder"]),
        drug("selegiline", &[Substrate], &["2B6"], 90.0, 10.0, 94.0, C::MaoInhibitor, &["pheochromocytoma"]),
    ]
}

/// Brand names, abbreviations and combination products.
pub(super) fn builtin_aliases() -> HashMap<String, String> {
    let mut map = HashMap::new();

    // Combination products map to their primary component
    map.insert("clavamox".into(), "amoxicillin".into());
    map.insert("augmentin".into(), "amoxicillin".into());

    // NSAIDs
    map.insert("rimadyl".into(), "carprofen".into());
    map.insert("novox".into(), "carprofen".into());
    map.insert("metacam".into(), "meloxicam".into());
    map.insert("loxicom".into(), "meloxicam".into());
    map.insert("previcox".into(), "firocoxib".into());

    // Opioids
    map.insert("mso4".into(), "morphine".into());
    map.insert("duragesic".into(), "fentanyl".into());
    map.insert("ultram".into(), "tramadol".into());
    map.insert("torbugesic".into(), "butorphanol".into());
    map.insert("torb".into(), "butorphanol".into());
    map.insert("buprenex".into(), "buprenorphine".into());
    map.insert("simbadol".into(), "buprenorphine".into());
    map.insert("bup".into(), "buprenorphine".into());

    // Sedatives and anesthetics
    map.insert("ace".into(), "acepromazine".into());
    map.insert("promace".into(), "acepromazine".into());
    map.insert("valium".into(), "diazepam".into());
    map.insert("dex".into(), "dexmedetomidine".into());
    map.insert("dexdomitor".into(), "dexmedetomidine".into());
    map.insert("propoflo".into(), "propofol".into());
    map.insert("rapinovet".into(), "propofol".into());
    map.insert("ketaset".into(), "ketamine".into());
    map.insert("vetalar".into(), "ketamine".into());
    map.insert("xylocaine".into(), "lidocaine".into());
    map.insert("lido".into(), "lidocaine".into());
    map.insert("marcaine".into(), "bupivacaine".into());

    // Anticonvulsants
    map.insert("phenobarb".into(), "phenobarbital".into());
    map.insert("pb".into(), "phenobarbital".into());
    map.insert("pentobarb".into(), "pentobarbital".into());
    map.insert("keppra".into(), "levetiracetam".into());
    map.insert("zonegran".into(), "zonisamide".into());
    map.insert("neurontin".into(), "gabapentin".into());
    map.insert("lyrica".into(), "pregabalin".into());

    // Antimicrobials
    map.insert("baytril".into(), "enrofloxacin".into());
    map.insert("cipro".into(), "ciprofloxacin".into());
    map.insert("flagyl".into(), "metronidazole".into());
    map.insert("zithromax".into(), "azithromycin".into());
    map.insert("keflex".into(), "cephalexin".into());
    map.insert("vibramycin".into(), "doxycycline".into());
    map.insert("nizoral".into(), "ketoconazole".into());
    map.insert("sporanox".into(), "itraconazole".into());
    map.insert("itrafungol".into(), "itraconazole".into());
    map.insert("diflucan".into(), "fluconazole".into());
    map.insert("lamisil".into(), "terbinafine".into());

    // Cardiovascular
    map.insert("lasix".into(), "furosemide".into());
    map.insert("salix".into(), "furosemide".into());
    map.insert("vetmedin".into(), "pimobendan".into());
    map.insert("enacard".into(), "enalapril".into());
    map.insert("fortekor".into(), "benazepril".into());
    map.insert("cardizem".into(), "diltiazem".into());
    map.insert("tenormin".into(), "atenolol".into());
    map.insert("lanoxin".into(), "digoxin".into());
    map.insert("coumadin".into(), "warfarin".into());
    map.insert("theo-24".into(), "theophylline".into());
    map.insert("aminophylline".into(), "theophylline".into());

    // Critical care
    map.insert("intropin".into(), "dopamine".into());
    map.insert("dobutrex".into(), "dobutamine".into());
    map.insert("adrenaline".into(), "epinephrine".into());
    map.insert("epi".into(), "epinephrine".into());

    // Behavioral
    map.insert("prozac".into(), "fluoxetine".into());
    map.insert("reconcile".into(), "fluoxetine".into());
    map.insert("zoloft".into(), "sertraline".into());
    map.insert("anipryl".into(), "selegiline".into());

    map
}

/// Formulation words stripped before lookup ("carprofen tablets").
pub(super) const FORMULATION_WORDS: &[&str] = &[
    "tablet",
    "tablets",
    "tab",
    "tabs",
    "capsule",
    "capsules",
    "injection",
    "injectable",
    "inj",
    "oral",
    "suspension",
    "solution",
    "iv",
    "im",
    "sc",
    "sq",
    "po",
    "hcl",
    "sodium",
];
