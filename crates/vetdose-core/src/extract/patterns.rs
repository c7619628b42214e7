//! Compiled regex patterns.
//!
//! Every pattern is a literal, so compiling it cannot fail at runtime.

use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

/// Decimal number capture.
macro_rules! num {
    () => {
        r"(\d+(?:\.\d+)?|\.\d+)"
    };
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

pub static INFUSION_INDICATORS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bcri\b",
        r"(?i)constant\s+rate\s+infusions?",
        r"(?i)infusion\s+(?:rate|calculation)",
        r"(?i)\b(?:mlk|flk)\b",
        r"(?is)morphine.*lidocaine.*ketamine",
        r"(?i)\b(?:dopamine|dobutamine|fentanyl|lidocaine|ketamine|dexmedetomidine|propofol)\s+(?:infusion|drip)\b",
        r"(?is)\bbag\b.*\bml\s*/\s*(?:hours?|hrs?)\b",
        r"(?is)\bpump\b.*(?:\brate\b|\bml\s*/\s*(?:hours?|hrs?)\b)",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

// ---------------------------------------------------------------------------
// Patient
// ---------------------------------------------------------------------------

pub static WEIGHT_KG: Lazy<Regex> =
    Lazy::new(|| compile(concat!(r"(?i)", num!(), r"\s*(?:kg|kgs|kilograms?|kilos?)\b")));

pub static WEIGHT_LB: Lazy<Regex> =
    Lazy::new(|| compile(concat!(r"(?i)", num!(), r"\s*(?:lbs?|pounds?)\b")));

pub static SPECIES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (compile(r"(?i)\b(?:dogs?|canines?|pupp(?:y|ies))\b"), "canine"),
        (compile(r"(?i)\b(?:cats?|felines?|kittens?)\b"), "feline"),
        (compile(r"(?i)\b(?:horses?|equines?|mares?|foals?|geldings?)\b"), "equine"),
        (compile(r"(?i)\b(?:cows?|cattle|bovines?|calf|calves|heifers?)\b"), "bovine"),
    ]
});

pub static CONDITIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (compile(r"(?i)\b(?:liver|hepatic)\s+disease\b"), "liver_disease"),
        (compile(r"(?i)\bhepatic\s+(?:compromise|impairment|insufficiency|dysfunction)\b"), "hepatic_compromise"),
        (compile(r"(?i)\belevated\s+liver\s+(?:enzymes|values)\b"), "elevated_liver_enzymes"),
        (compile(r"(?i)\b(?:seizures?|epilep\w*)\b"), "seizure_disorder"),
        (compile(r"(?i)\b(?:kidney\s+disease|ckd)\b"), "kidney_disease"),
        (compile(r"(?i)\brenal\s+(?:failure|insufficiency)\b"), "renal_failure"),
        (compile(r"(?i)\b(?:heart|cardiac)\s+(?:disease|failure)\b"), "heart_disease"),
        (compile(r"(?i)\bhypertension\b"), "hypertension"),
        (compile(r"(?i)\bhypotens(?:ion|ive)\b"), "hypotension"),
    ]
});

pub static INTERACTION_QUERY: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)\b(?:interact\w*|combination|combined|together|concurrent\w*|alongside|co-?administ\w*)\b")
});

pub static WORD: Lazy<Regex> = Lazy::new(|| compile(r"[A-Za-z][A-Za-z0-9\-]*"));

// ---------------------------------------------------------------------------
// Bag volume
// ---------------------------------------------------------------------------

/// "500 mL bag", "1 L LRS bag"
pub static BAG_BEFORE: Lazy<Regex> = Lazy::new(|| {
    compile(concat!(
        r"(?i)",
        num!(),
        r"\s*(ml|l)\b\s*(?:(?:fluid|saline|lrs|nacl|ns|d5w|crystalloid)\s+)?bag\b"
    ))
});

/// "500 mL of saline", "1 L LRS"
pub static BAG_FLUID: Lazy<Regex> = Lazy::new(|| {
    compile(concat!(
        r"(?i)",
        num!(),
        r"\s*(ml|l)\b\s*(?:of\s+)?(?:0\.9%\s*)?(?:saline|nacl|lrs|d5w|fluids?|normosol|plasma-?lyte|lactated|crystalloid)"
    ))
});

/// "bag of 500 mL". Group 3 captures a trailing rate suffix, which disqualifies the match.
pub static BAG_AFTER: Lazy<Regex> = Lazy::new(|| {
    compile(concat!(
        r"(?i)\bbag\b[^\d.]{0,30}?",
        num!(),
        r"\s*(ml|l)\b(\s*/|\s+per\b)?"
    ))
});

/// "in a 500 mL". Group 3 as above.
pub static BAG_IN: Lazy<Regex> = Lazy::new(|| {
    compile(concat!(
        r"(?i)\bin\s+(?:a\s+)?",
        num!(),
        r"\s*(ml|l)\b(\s*/|\s+per\b)?"
    ))
});

pub static STANDARD_BAG: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bstandard\b.{0,20}?\bbag\b"));

// ---------------------------------------------------------------------------
// Flow and duration
// ---------------------------------------------------------------------------

pub static FLOW_RATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        compile(concat!(r"(?i)", num!(), r"\s*ml\s*/\s*(?:hours?|hrs?|h)\b")),
        compile(concat!(r"(?i)", num!(), r"\s*ml\s+(?:per|an|a|each)\s+(?:hours?|hrs?|h)\b")),
        compile(concat!(r"(?i)\brate\s+(?:of|at)\s+", num!(), r"\s*ml\b")),
    ]
});

pub static DURATION: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        compile(concat!(r"(?i)\bover\s+", num!(), r"\s*(?:hours?|hrs?|h)\b")),
        compile(concat!(r"(?i)", num!(), r"[\s-]*(?:hours?|hrs?|h)[\s-]+(?:duration|infusion|run)\b")),
        compile(concat!(r"(?i)\bduration\s+(?:of\s+)?", num!(), r"\s*(?:hours?|hrs?|h)\b")),
        compile(concat!(r"(?i)\blasts?\s+", num!(), r"\s*(?:hours?|hrs?|h)\b")),
    ]
});

pub static MAINTENANCE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bmaintenance\s+(?:fluid\s+)?rate\b"));

// ---------------------------------------------------------------------------
// Dose and concentration
// ---------------------------------------------------------------------------

/// Groups: value, mass unit, time unit.
pub static DOSE_RATE: Lazy<Regex> = Lazy::new(|| {
    compile(concat!(
        r"(?i)",
        num!(),
        r"\s*(mg|mcg|µg|μg|ug)\s*(?:/|per)\s*kg\s*(?:/|per)\s*(minutes?|min|hours?|hrs?|h)\b"
    ))
});

/// Groups: value, mass unit, optional time suffix (disqualifies a simple dose).
pub static DOSE_PER_KG: Lazy<Regex> = Lazy::new(|| {
    compile(concat!(
        r"(?i)",
        num!(),
        r"\s*(mg|mcg|µg|μg|ug)\s*(?:/|per)\s*kg\b(\s*(?:/|per)\s*[a-z]+)?"
    ))
});

/// Groups: mg amount, mL volume.
pub static CONC_VIAL: Lazy<Regex> = Lazy::new(|| {
    compile(concat!(
        r"(?i)",
        num!(),
        r"\s*mg\s+(?:vials?|ampules?|ampoules?|bottles?)\b.{0,40}?",
        num!(),
        r"\s*ml\b"
    ))
});

/// Groups: value, mass unit.
pub static CONC_MASS_PER_ML: Lazy<Regex> = Lazy::new(|| {
    compile(concat!(
        r"(?i)",
        num!(),
        r"\s*(mg|mcg|µg|μg|ug)\s*(?:/|per)\s*ml\b"
    ))
});

pub static CONC_PERCENT: Lazy<Regex> = Lazy::new(|| compile(concat!(num!(), r"\s*%")));

/// Stated total, e.g. "total dose = 88 mg".
pub static STATED_TOTAL_MG: Lazy<Regex> = Lazy::new(|| {
    compile(concat!(
        r"(?i)(?:total(?:\s+dose)?\s*(?:=|:|of|is)?|=)\s*",
        num!(),
        r"\s*mg\b"
    ))
});

pub fn parse_number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(INFUSION_INDICATORS.len(), 8);
        assert_eq!(SPECIES.len(), 4);
        assert_eq!(CONDITIONS.len(), 9);
        Lazy::force(&WEIGHT_KG);
        Lazy::force(&WEIGHT_LB);
        Lazy::force(&BAG_BEFORE);
        Lazy::force(&BAG_FLUID);
        Lazy::force(&BAG_AFTER);
        Lazy::force(&BAG_IN);
        Lazy::force(&STANDARD_BAG);
        assert_eq!(FLOW_RATE.len(), 3);
        assert_eq!(DURATION.len(), 4);
        Lazy::force(&MAINTENANCE);
        Lazy::force(&DOSE_RATE);
        Lazy::force(&DOSE_PER_KG);
        Lazy::force(&CONC_VIAL);
        Lazy::force(&CONC_MASS_PER_ML);
        Lazy::force(&CONC_PERCENT);
        Lazy::force(&STATED_TOTAL_MG);
        Lazy::force(&INTERACTION_QUERY);
        Lazy::force(&WORD);
    }

    #[test]
    fn test_dose_rate_units() {
        let caps = DOSE_RATE.captures("Dopamine at 5 µg/kg/minute").unwrap();
        assert_eq!(&caps[1], "5");
        assert_eq!(&caps[3], "minute");

        let caps = DOSE_RATE.captures("2.4 mg per kg per hr").unwrap();
        assert_eq!(&caps[1], "2.4");
        assert_eq!(&caps[2], "mg");

        let caps = DOSE_RATE.captures("5 μg/kg/min").unwrap();
        assert_eq!(&caps[2], "μg");
    }

    #[test]
    fn test_bag_rate_suffix_captured() {
        let caps = BAG_AFTER.captures("bag running at 10 mL/hour").unwrap();
        assert!(caps.get(3).is_some());

        let caps = BAG_AFTER.captures("bag of 500 mL").unwrap();
        assert!(caps.get(3).is_none());
    }
}
