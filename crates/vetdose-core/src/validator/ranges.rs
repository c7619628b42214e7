//! Curated safe dose ranges and the critical-drug list.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a safe range is expressed per.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoseBasis {
    /// mg/kg (single dose)
    PerKg,
    /// mg/kg/hour (infusion)
    PerKgPerHour,
    /// mg/kg/day (maintenance)
    PerKgPerDay,
}

impl DoseBasis {
    pub fn label(&self) -> &'static str {
        match self {
            DoseBasis::PerKg => "mg/kg",
            DoseBasis::PerKgPerHour => "mg/kg/hr",
            DoseBasis::PerKgPerDay => "mg/kg/day",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeRange {
    pub drug: &'static str,
    pub basis: DoseBasis,
    pub min: f64,
    pub max: f64,
}

impl SafeRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const SAFE_RANGES: &[SafeRange] = &[
    SafeRange { drug: "morphine", basis: DoseBasis::PerKg, min: 0.1, max: 2.0 },
    SafeRange { drug: "acepromazine", basis: DoseBasis::PerKg, min: 0.01, max: 0.1 },
    SafeRange { drug: "lidocaine", basis: DoseBasis::PerKgPerHour, min: 1.0, max: 4.0 },
    SafeRange { drug: "ketamine", basis: DoseBasis::PerKgPerHour, min: 0.5, max: 2.0 },
    SafeRange { drug: "morphine", basis: DoseBasis::PerKgPerHour, min: 0.05, max: 0.5 },
    SafeRange { drug: "fentanyl", basis: DoseBasis::PerKgPerHour, min: 0.001, max: 0.02 },
    SafeRange { drug: "dopamine", basis: DoseBasis::PerKgPerHour, min: 0.06, max: 1.2 },
    SafeRange { drug: "dobutamine", basis: DoseBasis::PerKgPerHour, min: 0.06, max: 1.2 },
    SafeRange { drug: "dexmedetomidine", basis: DoseBasis::PerKgPerHour, min: 0.0005, max: 0.003 },
    SafeRange { drug: "propofol", basis: DoseBasis::PerKgPerHour, min: 6.0, max: 24.0 },
    SafeRange { drug: "butorphanol", basis: DoseBasis::PerKgPerHour, min: 0.1, max: 0.4 },
    SafeRange { drug: "phenobarbital", basis: DoseBasis::PerKgPerDay, min: 2.0, max: 8.0 },
];

/// Drugs whose presence makes any calculation critical-risk.
pub const CRITICAL_DRUGS: &[&str] = &[
    "morphine",
    "fentanyl",
    "butorphanol",
    "buprenorphine",
    "propofol",
    "pentobarbital",
    "phenobarbital",
    "insulin",
    "epinephrine",
    "dopamine",
    "dobutamine",
];

pub fn is_critical(drug: &str) -> bool {
    CRITICAL_DRUGS.contains(&drug)
}

pub fn range_for(drug: &str, basis: DoseBasis) -> Option<&'static SafeRange> {
    SAFE_RANGES.iter().find(|r| r.drug == drug && r.basis == basis)
}

/// A dose outside its curated range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeViolation {
    pub range: SafeRange,
    /// Dose expressed on the range's basis
    pub value: f64,
}

impl fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.range.basis.label();
        write!(
            f,
            "{} dose {:.4} {} is outside the safe range {}-{} {}",
            self.range.drug, self.value, unit, self.range.min, self.range.max, unit
        )
    }
}

/// Check an infusion dose on the hourly basis, else the daily basis.
///
/// Returns `None` when the dose is in range or no range is known.
pub fn check_infusion_dose(drug: &str, mg_per_kg_per_hour: f64) -> Option<RangeViolation> {
    let (range, value) = match range_for(drug, DoseBasis::PerKgPerHour) {
        Some(range) => (range, mg_per_kg_per_hour),
        None => (range_for(drug, DoseBasis::PerKgPerDay)?, mg_per_kg_per_hour * 24.0),
    };
    (!range.contains(value)).then(|| RangeViolation { range: *range, value })
}

/// Check a single dose on the per-kg basis.
pub fn check_single_dose(drug: &str, mg_per_kg: f64) -> Option<RangeViolation> {
    let range = range_for(drug, DoseBasis::PerKg)?;
    (!range.contains(mg_per_kg)).then(|| RangeViolation { range: *range, value: mg_per_kg })
}
