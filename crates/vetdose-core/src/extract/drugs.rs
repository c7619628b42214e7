//! Infusion drug catalogue and per-drug dose/concentration extraction.
//!
//! Each drug mention owns the text segment that runs up to the next mention
//! of a different catalogue drug. Dose and concentration are searched in that
//! segment first, then in the unclaimed text just before the mention.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::patterns::{self, parse_number};
use crate::models::{Concentration, ConcentrationUnit, DoseRate, DoseUnit};

/// A recognized CRI drug.
#[derive(Debug)]
pub struct CatalogueDrug {
    /// Canonical name
    pub name: &'static str,
    /// Synonyms matched on word boundaries
    pub synonyms: &'static [&'static str],
    /// Usual stock concentration, used only under heuristic fallback
    pub stock: Concentration,
    pattern: Regex,
}

fn entry(name: &'static str, synonyms: &'static [&'static str], stock: Concentration) -> CatalogueDrug {
    let alternatives = std::iter::once(name)
        .chain(synonyms.iter().copied())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    #[allow(clippy::expect_used)]
    let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives)).expect("catalogue pattern compiles");
    CatalogueDrug {
        name,
        synonyms,
        stock,
        pattern,
    }
}

/// The fixed catalogue, in lookup order.
pub static CATALOGUE: Lazy<Vec<CatalogueDrug>> = Lazy::new(|| {
    vec![
        entry("morphine", &["mso4"], Concentration::mg_per_ml(15.0)),
        entry("lidocaine", &["lidocaine hcl", "xylocaine", "lido"], Concentration::mg_per_ml(20.0)),
        entry("ketamine", &["ketaset", "vetalar"], Concentration::mg_per_ml(100.0)),
        entry(
            "fentanyl",
            &["fentanyl citrate"],
            Concentration::new(50.0, ConcentrationUnit::McgPerMl),
        ),
        entry("dopamine", &["intropin"], Concentration::mg_per_ml(40.0)),
        entry("dobutamine", &["dobutrex"], Concentration::mg_per_ml(12.5)),
        entry(
            "dexmedetomidine",
            &["dexdomitor", "dex"],
            Concentration::mg_per_ml(0.5),
        ),
        entry("propofol", &["propoflo", "rapinovet"], Concentration::mg_per_ml(10.0)),
        entry("butorphanol", &["torbugesic", "torb"], Concentration::mg_per_ml(10.0)),
    ]
});

/// Catalogue entry by canonical name.
pub fn catalogue_drug(name: &str) -> Option<&'static CatalogueDrug> {
    CATALOGUE.iter().find(|d| d.name == name)
}

/// Position of a run of mentions of one catalogue drug.
#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    pub drug: &'static str,
    pub start: usize,
    pub end: usize,
}

/// Catalogue mentions in text order, with adjacent mentions of the same drug merged.
pub fn find_mentions(text: &str) -> Vec<Mention> {
    let mut mentions: Vec<Mention> = CATALOGUE
        .iter()
        .flat_map(|drug| {
            drug.pattern.find_iter(text).map(move |m| Mention {
                drug: drug.name,
                start: m.start(),
                end: m.end(),
            })
        })
        .collect();
    mentions.sort_by_key(|m| (m.start, std::cmp::Reverse(m.end)));

    let mut merged: Vec<Mention> = Vec::with_capacity(mentions.len());
    for mention in mentions {
        match merged.last_mut() {
            // overlapping synonym ("lidocaine" inside "lidocaine hcl")
            Some(last) if mention.start < last.end => {}
            Some(last) if last.drug == mention.drug => last.end = mention.end,
            _ => merged.push(mention),
        }
    }
    merged
}

/// What was found for one mentioned drug.
#[derive(Debug, Clone, PartialEq)]
pub struct DrugFinding {
    pub drug: &'static str,
    pub dose: Option<DoseRate>,
    pub concentration: Option<Concentration>,
}

/// Scan all catalogue drugs in mention order. A drug is reported once.
pub fn scan_drugs(text: &str) -> Vec<DrugFinding> {
    let mentions = find_mentions(text);
    let mut findings: Vec<DrugFinding> = Vec::new();
    let mut claimed = 0usize;

    for (i, mention) in mentions.iter().enumerate() {
        let segment_end = mentions[i + 1..]
            .iter()
            .find(|m| m.drug != mention.drug)
            .map_or(text.len(), |m| m.start);
        let previous_end = mentions[..i]
            .iter()
            .rev()
            .find(|m| m.drug != mention.drug)
            .map_or(0, |m| m.end);

        let forward = mention.end..segment_end;
        let backward = previous_end.max(claimed).min(mention.start)..mention.start;

        let dose = find_dose(text, forward.clone()).or_else(|| find_dose_before(text, backward.clone()));
        let concentration =
            find_concentration(text, forward.clone()).or_else(|| find_concentration_before(text, backward));

        if let Some((_, used)) = &dose {
            claimed = claimed.max(used.end);
        }
        if let Some((_, used)) = &concentration {
            claimed = claimed.max(used.end);
        }

        let existing = findings.iter_mut().find(|f| f.drug == mention.drug);
        match existing {
            Some(found) => {
                if found.dose.is_none() {
                    found.dose = dose.map(|(d, _)| d);
                }
                if found.concentration.is_none() {
                    found.concentration = concentration.map(|(c, _)| c);
                }
            }
            None => findings.push(DrugFinding {
                drug: mention.drug,
                dose: dose.map(|(d, _)| d),
                concentration: concentration.map(|(c, _)| c),
            }),
        }
    }
    findings
}

fn dose_from(caps: &Captures<'_>) -> Option<DoseRate> {
    let value = parse_number(caps.get(1)?.as_str())?;
    let unit = DoseUnit::from_tokens(caps.get(2)?.as_str(), caps.get(3)?.as_str())?;
    Some(DoseRate::new(value, unit))
}

fn find_dose(text: &str, range: Range<usize>) -> Option<(DoseRate, Range<usize>)> {
    let segment = text.get(range.clone())?;
    patterns::DOSE_RATE.captures_iter(segment).find_map(|caps| {
        let whole = caps.get(0)?;
        dose_from(&caps).map(|d| (d, range.start + whole.start()..range.start + whole.end()))
    })
}

/// Closest dose before the mention.
fn find_dose_before(text: &str, range: Range<usize>) -> Option<(DoseRate, Range<usize>)> {
    let segment = text.get(range.clone())?;
    patterns::DOSE_RATE
        .captures_iter(segment)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            dose_from(&caps).map(|d| (d, range.start + whole.start()..range.start + whole.end()))
        })
        .last()
}

/// Every concentration in a segment, in text order.
fn concentrations(segment: &str) -> Vec<(Concentration, Range<usize>)> {
    let mut found = Vec::new();

    for caps in patterns::CONC_VIAL.captures_iter(segment) {
        let (Some(whole), Some(mg), Some(ml)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if let (Some(mg), Some(ml)) = (parse_number(mg.as_str()), parse_number(ml.as_str())) {
            if ml > 0.0 {
                found.push((Concentration::mg_per_ml(mg / ml), whole.range()));
            }
        }
    }

    for caps in patterns::CONC_MASS_PER_ML.captures_iter(segment) {
        let (Some(whole), Some(value), Some(mass)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if found.iter().any(|(_, r)| r.start <= whole.start() && whole.start() < r.end) {
            continue;
        }
        let Some(value) = parse_number(value.as_str()) else {
            continue;
        };
        let unit = if mass.as_str().eq_ignore_ascii_case("mg") {
            ConcentrationUnit::MgPerMl
        } else {
            ConcentrationUnit::McgPerMl
        };
        found.push((Concentration::new(value, unit), whole.range()));
    }

    for caps in patterns::CONC_PERCENT.captures_iter(segment) {
        let (Some(whole), Some(value)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // "0.9% saline" describes the carrier fluid
        let after = segment[whole.end()..].trim_start().to_lowercase();
        if ["saline", "nacl", "sodium"].iter().any(|w| after.starts_with(w)) {
            continue;
        }
        if let Some(value) = parse_number(value.as_str()) {
            found.push((Concentration::new(value, ConcentrationUnit::Percent), whole.range()));
        }
    }

    found.sort_by_key(|(_, r)| r.start);
    found
}

fn find_concentration(text: &str, range: Range<usize>) -> Option<(Concentration, Range<usize>)> {
    let segment = text.get(range.clone())?;
    concentrations(segment)
        .into_iter()
        .next()
        .map(|(c, r)| (c, range.start + r.start..range.start + r.end))
}

fn find_concentration_before(text: &str, range: Range<usize>) -> Option<(Concentration, Range<usize>)> {
    let segment = text.get(range.clone())?;
    concentrations(segment)
        .into_iter()
        .last()
        .map(|(c, r)| (c, range.start + r.start..range.start + r.end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_has_nine_drugs() {
        assert_eq!(CATALOGUE.len(), 9);
        assert_eq!(catalogue_drug("dopamine").unwrap().stock.to_mg_per_ml(), 40.0);
        assert!((catalogue_drug("fentanyl").unwrap().stock.to_mg_per_ml() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_synonyms_on_word_boundaries() {
        let mentions = find_mentions("Dex and dexamethasone with Torb");
        let drugs: Vec<_> = mentions.iter().map(|m| m.drug).collect();
        assert_eq!(drugs, vec!["dexmedetomidine", "butorphanol"]);
    }

    #[test]
    fn test_segments_keep_values_with_their_drug() {
        let findings = scan_drugs(
            "morphine 0.12 mg/kg/hr (15 mg/mL), lidocaine 2.4 mg/kg/hr (20 mg/mL), ketamine 0.6 mg/kg/hr (100 mg/mL)",
        );
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].drug, "morphine");
        assert_eq!(findings[0].dose, Some(DoseRate::mg_per_kg_per_hour(0.12)));
        assert_eq!(findings[1].concentration, Some(Concentration::mg_per_ml(20.0)));
        assert_eq!(findings[2].concentration, Some(Concentration::mg_per_ml(100.0)));
    }

    #[test]
    fn test_claimed_values_not_reused() {
        let findings = scan_drugs("morphine 0.1 mg/kg/hr at 15 mg/mL and lidocaine 2 mg/kg/hr");
        assert_eq!(findings[1].drug, "lidocaine");
        assert!(findings[1].concentration.is_none());
    }

    #[test]
    fn test_backward_fallback() {
        let findings = scan_drugs("add 40 mg/mL dopamine at 5 mcg/kg/min");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].concentration, Some(Concentration::mg_per_ml(40.0)));
        assert_eq!(
            findings[0].dose,
            Some(DoseRate::new(5.0, DoseUnit::McgPerKgPerMinute))
        );
    }

    #[test]
    fn test_concentration_forms() {
        let findings = scan_drugs("lidocaine 2% at 50 mcg/kg/min");
        assert_eq!(
            findings[0].concentration,
            Some(Concentration::new(2.0, ConcentrationUnit::Percent))
        );

        let findings = scan_drugs("fentanyl 5 mcg/kg/hr from a 2.5 mg vial diluted in 50 mL");
        let conc = findings[0].concentration.unwrap();
        assert!((conc.to_mg_per_ml() - 0.05).abs() < 1e-12);

        let findings = scan_drugs("fentanyl 3 µg/kg/h, 50 µg/mL");
        assert_eq!(
            findings[0].concentration,
            Some(Concentration::new(50.0, ConcentrationUnit::McgPerMl))
        );
    }

    #[test]
    fn test_saline_percent_ignored() {
        let findings = scan_drugs("lidocaine 2 mg/kg/hr in 0.9% saline");
        assert!(findings[0].concentration.is_none());
    }

    #[test]
    fn test_drug_without_dose() {
        let findings = scan_drugs("is ketamine safe here");
        assert_eq!(findings.len(), 1);
        assert!(findings[0].dose.is_none());
    }
}
