//! Criteria Validator — five pass/fail checks over a candidate document.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::transform::sections::Section;

/// Minimum share of the original's long words that must reappear in the candidate.
pub const MIN_CONTENT_PRESERVATION: f64 = 0.85;
const MIN_SC_LINES: usize = 3;
const MIN_TECHNIQUE_INDICATORS: usize = 4;

const TECHNIQUE_INDICATORS: [&str; 6] = [
    "chain-of-thought",
    "task 1",
    "task 2",
    "role",
    "background",
    "validation loop",
];

static SC_LINE: OnceLock<Regex> = OnceLock::new();

fn sc_line() -> &'static Regex {
    SC_LINE.get_or_init(|| Regex::new(r"SC\d+:").expect("Invalid SC line pattern"))
}

/// A failed check. `Display` renders the human-readable label carried in loop logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnmetCriterion {
    ContentPreservation,
    Structure { missing: Vec<&'static str> },
    ScCount { found: usize },
    EngineeringTechniques,
    ValidationLoopPseudocode,
}

impl fmt::Display for UnmetCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmetCriterion::ContentPreservation => f.write_str("Content preservation"),
            UnmetCriterion::Structure { missing } => {
                write!(f, "Structure (missing: {})", missing.join(", "))
            }
            UnmetCriterion::ScCount { found } => {
                write!(f, "SC count ({found} found, need ≥{MIN_SC_LINES})")
            }
            UnmetCriterion::EngineeringTechniques => f.write_str("Engineering techniques"),
            UnmetCriterion::ValidationLoopPseudocode => f.write_str("Validation loop pseudocode"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub all_met: bool,
    pub unmet: Vec<UnmetCriterion>,
}

impl ValidationVerdict {
    pub fn labels(&self) -> Vec<String> {
        self.unmet.iter().map(ToString::to_string).collect()
    }
}

/// Runs all five checks in order. Pure.
pub fn validate_document(document: &str, original_input: &str) -> ValidationVerdict {
    let lower = document.to_lowercase();
    let mut unmet = Vec::new();

    if content_preservation_ratio(document, original_input) < MIN_CONTENT_PRESERVATION {
        unmet.push(UnmetCriterion::ContentPreservation);
    }

    let missing = missing_sections(document);
    if !missing.is_empty() {
        unmet.push(UnmetCriterion::Structure { missing });
    }

    let found = count_sc_lines(document);
    if found < MIN_SC_LINES {
        unmet.push(UnmetCriterion::ScCount { found });
    }

    let techniques = TECHNIQUE_INDICATORS
        .iter()
        .filter(|i| lower.contains(*i))
        .count();
    if techniques < MIN_TECHNIQUE_INDICATORS {
        unmet.push(UnmetCriterion::EngineeringTechniques);
    }

    if !lower.contains("while") || !lower.contains("iteration") {
        unmet.push(UnmetCriterion::ValidationLoopPseudocode);
    }

    ValidationVerdict {
        all_met: unmet.is_empty(),
        unmet,
    }
}

/// Section tokens absent from `document` (case-insensitive substring), in section order.
pub fn missing_sections(document: &str) -> Vec<&'static str> {
    let lower = document.to_lowercase();
    Section::ALL
        .iter()
        .map(Section::required_token)
        .filter(|token| !lower.contains(token))
        .collect()
}

/// Occurrences of the literal `SC<digits>:` pattern. Case-sensitive.
pub fn count_sc_lines(document: &str) -> usize {
    sc_line().find_iter(document).count()
}

/// Share of the original's distinct lowercase words longer than three characters that
/// also appear as whitespace-delimited words in the document. 1.0 when there are none.
fn content_preservation_ratio(document: &str, original_input: &str) -> f64 {
    let original_lower = original_input.to_lowercase();
    let original: HashSet<&str> = original_lower
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .collect();
    if original.is_empty() {
        return 1.0;
    }

    let doc_lower = document.to_lowercase();
    let candidate: HashSet<&str> = doc_lower.split_whitespace().collect();
    let kept = original.iter().filter(|w| candidate.contains(*w)).count();
    kept as f64 / original.len() as f64
}
