//! Structured infusion request models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dose-rate unit as stated by the clinician.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DoseUnit {
    /// mg/kg/hour (canonical)
    MgPerKgPerHour,
    /// µg/kg/hour
    McgPerKgPerHour,
    /// mg/kg/minute
    MgPerKgPerMinute,
    /// µg/kg/minute
    McgPerKgPerMinute,
}

impl DoseUnit {
    /// Resolve a unit from its mass and time tokens (e.g. "mcg", "min").
    pub fn from_tokens(mass: &str, time: &str) -> Option<Self> {
        let micro = match mass.to_lowercase().as_str() {
            "mg" => false,
            "mcg" | "µg" | "μg" | "ug" => true,
            _ => return None,
        };
        let per_minute = match time.to_lowercase().as_str() {
            "minute" | "min" | "minutes" => true,
            "hour" | "hr" | "h" | "hours" | "hrs" => false,
            _ => return None,
        };
        Some(match (micro, per_minute) {
            (false, false) => DoseUnit::MgPerKgPerHour,
            (true, false) => DoseUnit::McgPerKgPerHour,
            (false, true) => DoseUnit::MgPerKgPerMinute,
            (true, true) => DoseUnit::McgPerKgPerMinute,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            DoseUnit::MgPerKgPerHour => "mg/kg/hr",
            DoseUnit::McgPerKgPerHour => "µg/kg/hr",
            DoseUnit::MgPerKgPerMinute => "mg/kg/min",
            DoseUnit::McgPerKgPerMinute => "µg/kg/min",
        }
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self, DoseUnit::MgPerKgPerHour)
    }
}

/// A dose rate: magnitude plus unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DoseRate {
    pub value: f64,
    pub unit: DoseUnit,
}

impl DoseRate {
    pub fn new(value: f64, unit: DoseUnit) -> Self {
        Self { value, unit }
    }

    pub fn mg_per_kg_per_hour(value: f64) -> Self {
        Self::new(value, DoseUnit::MgPerKgPerHour)
    }

    /// Convert to mg/kg/hour.
    ///
    /// µg/kg/min converts as `(value × 60) / 1000`.
    pub fn to_mg_per_kg_per_hour(&self) -> f64 {
        match self.unit {
            DoseUnit::MgPerKgPerHour => self.value,
            DoseUnit::McgPerKgPerHour => self.value / 1000.0,
            DoseUnit::MgPerKgPerMinute => self.value * 60.0,
            DoseUnit::McgPerKgPerMinute => (self.value * 60.0) / 1000.0,
        }
    }
}

impl fmt::Display for DoseRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit.label())
    }
}

/// Stock concentration unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConcentrationUnit {
    /// mg/mL (canonical)
    MgPerMl,
    /// µg/mL
    McgPerMl,
    /// % w/v (1% = 10 mg/mL)
    Percent,
}

impl ConcentrationUnit {
    pub fn label(&self) -> &'static str {
        match self {
            ConcentrationUnit::MgPerMl => "mg/mL",
            ConcentrationUnit::McgPerMl => "µg/mL",
            ConcentrationUnit::Percent => "%",
        }
    }
}

/// A stock concentration: magnitude plus unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Concentration {
    pub value: f64,
    pub unit: ConcentrationUnit,
}

impl Concentration {
    pub fn new(value: f64, unit: ConcentrationUnit) -> Self {
        Self { value, unit }
    }

    pub fn mg_per_ml(value: f64) -> Self {
        Self::new(value, ConcentrationUnit::MgPerMl)
    }

    /// Convert to mg/mL.
    pub fn to_mg_per_ml(&self) -> f64 {
        match self.unit {
            ConcentrationUnit::MgPerMl => self.value,
            ConcentrationUnit::McgPerMl => self.value / 1000.0,
            ConcentrationUnit::Percent => self.value * 10.0,
        }
    }
}

impl fmt::Display for Concentration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            ConcentrationUnit::Percent => write!(f, "{}%", self.value),
            _ => write!(f, "{} {}", self.value, self.unit.label()),
        }
    }
}

/// A single drug to be added to the infusion bag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfusionDrug {
    /// Drug name (canonical catalogue name where recognized)
    pub name: String,
    /// Dose rate as stated
    pub dose: DoseRate,
    /// Stock concentration as stated
    pub concentration: Concentration,
}

impl InfusionDrug {
    pub fn new(name: impl Into<String>, dose: DoseRate, concentration: Concentration) -> Self {
        Self {
            name: name.into(),
            dose,
            concentration,
        }
    }
}

/// How the infusion flow rate is specified.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowSpec {
    /// Stated directly in mL/hour
    Rate { ml_per_hour: f64 },
    /// Target run time; flow = bag volume / hours
    Duration { hours: f64 },
    /// Maintenance fluid rate; flow = weight × mL/kg/hour
    Maintenance { ml_per_kg_per_hour: f64 },
}

/// A request field that can be substituted by the heuristic fallback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum RequestField {
    Weight,
    BagVolume,
    FlowRate,
    Concentration { drug: String },
}

impl fmt::Display for RequestField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestField::Weight => write!(f, "patient weight"),
            RequestField::BagVolume => write!(f, "bag volume"),
            RequestField::FlowRate => write!(f, "flow rate"),
            RequestField::Concentration { drug } => write!(f, "{} concentration", drug),
        }
    }
}

/// Where the request values came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    /// Every field was parsed from the query or supplied by the caller
    #[default]
    Parsed,
    /// One or more fields were substituted with defaults (low confidence)
    Heuristic { substituted: Vec<RequestField> },
}

impl Provenance {
    pub fn is_heuristic(&self) -> bool {
        matches!(self, Provenance::Heuristic { .. })
    }

    pub fn substituted(&self) -> &[RequestField] {
        match self {
            Provenance::Parsed => &[],
            Provenance::Heuristic { substituted } => substituted,
        }
    }
}

/// A structured constant-rate-infusion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfusionRequest {
    /// Patient weight in kg
    pub weight_kg: f64,
    /// Fluid bag volume in mL
    pub bag_volume_ml: f64,
    /// Flow rate or the quantity it is derived from
    pub flow: FlowSpec,
    /// Drugs to add, in the order they were stated
    pub drugs: Vec<InfusionDrug>,
    /// Patient species if known (canine, feline, ...)
    pub species: Option<String>,
    /// Parsed vs heuristic
    #[serde(default)]
    pub provenance: Provenance,
}

impl InfusionRequest {
    /// Create a fully-specified request with a stated flow rate.
    pub fn new(
        weight_kg: f64,
        bag_volume_ml: f64,
        flow_rate_ml_per_hour: f64,
        drugs: Vec<InfusionDrug>,
    ) -> Self {
        Self::with_flow(
            weight_kg,
            bag_volume_ml,
            FlowSpec::Rate {
                ml_per_hour: flow_rate_ml_per_hour,
            },
            drugs,
        )
    }

    /// Create a request with any flow specification.
    pub fn with_flow(weight_kg: f64, bag_volume_ml: f64, flow: FlowSpec, drugs: Vec<InfusionDrug>) -> Self {
        Self {
            weight_kg,
            bag_volume_ml,
            flow,
            drugs,
            species: None,
            provenance: Provenance::Parsed,
        }
    }

    pub fn with_species(mut self, species: impl Into<String>) -> Self {
        self.species = Some(species.into());
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn is_heuristic(&self) -> bool {
        self.provenance.is_heuristic()
    }

    pub fn drug_names(&self) -> Vec<String> {
        self.drugs.iter().map(|d| d.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dose_conversion() {
        let dopamine = DoseRate::new(5.0, DoseUnit::McgPerKgPerMinute);
        assert!((dopamine.to_mg_per_kg_per_hour() - 0.3).abs() < 1e-12);

        let fentanyl = DoseRate::new(5.0, DoseUnit::McgPerKgPerHour);
        assert!((fentanyl.to_mg_per_kg_per_hour() - 0.005).abs() < 1e-12);

        let lidocaine = DoseRate::mg_per_kg_per_hour(2.4);
        assert_eq!(lidocaine.to_mg_per_kg_per_hour(), 2.4);
    }

    #[test]
    fn test_unit_tokens() {
        assert_eq!(DoseUnit::from_tokens("mcg", "min"), Some(DoseUnit::McgPerKgPerMinute));
        assert_eq!(DoseUnit::from_tokens("μg", "minute"), Some(DoseUnit::McgPerKgPerMinute));
        assert_eq!(DoseUnit::from_tokens("MG", "hr"), Some(DoseUnit::MgPerKgPerHour));
        assert_eq!(DoseUnit::from_tokens("g", "hr"), None);
        assert_eq!(DoseUnit::from_tokens("mg", "day"), None);
    }

    #[test]
    fn test_concentration_conversion() {
        assert_eq!(Concentration::mg_per_ml(40.0).to_mg_per_ml(), 40.0);
        assert_eq!(Concentration::new(2.0, ConcentrationUnit::Percent).to_mg_per_ml(), 20.0);
        assert!((Concentration::new(50.0, ConcentrationUnit::McgPerMl).to_mg_per_ml() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_provenance() {
        let request = InfusionRequest::new(10.0, 500.0, 10.0, vec![]);
        assert!(!request.is_heuristic());

        let request = request.with_provenance(Provenance::Heuristic {
            substituted: vec![RequestField::Weight],
        });
        assert!(request.is_heuristic());
        assert_eq!(request.provenance.substituted(), &[RequestField::Weight]);
    }
}
