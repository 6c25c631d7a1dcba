//! Heuristic scorecard — seven named PASS/FAIL checks over a finished document.
//!
//! Independent of the validation loop: used by `/api/v1/validate` and to re-verify
//! transform and enhancement output before it is returned.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::transform::analyzer::{sentences, word_count};
use crate::transform::metrics::round2;
use crate::transform::sections::Section;
use crate::transform::validator::missing_sections;

const LOOP_INDICATORS: [&str; 7] = [
    "VALIDATION_LOOP",
    "FOR each",
    "IF",
    "REGENERATE",
    "REPEAT",
    "MARK",
    "COMPLETE",
];

const TECHNIQUE_PATTERNS: [(&str, &[&str]); 6] = [
    (
        "Chain-of-Thought",
        &["[Chain-of-Thought", "Step 1:", "Step 2:", "Then:", "Finally:"],
    ),
    ("Role Prompting", &["[Role Prompting", "Act as", "You are"]),
    (
        "Tree-of-Thoughts",
        &["[Tree-of-Thoughts", "Alternative", "Option", "Branch"],
    ),
    (
        "Generate-Knowledge",
        &["[Generate-Knowledge", "Context:", "Background:", "Domain:"],
    ),
    (
        "Decomposition",
        &["[Decomposition", "Subtask", "Break down", "Component"],
    ),
    (
        "Recursive Validation",
        &["Validation Loop", "VALIDATION_LOOP", "recursive"],
    ),
];

static SC_REFERENCE: OnceLock<Regex> = OnceLock::new();

fn sc_reference() -> &'static Regex {
    SC_REFERENCE
        .get_or_init(|| Regex::new(r"sc\d+|success criter").expect("Invalid SC reference pattern"))
}

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    Pass,
    Fail,
}

impl TestStatus {
    fn from_bool(passed: bool) -> Self {
        if passed {
            TestStatus::Pass
        } else {
            TestStatus::Fail
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_name: String,
    pub expected: String,
    pub actual: String,
    pub status: TestStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    /// Percentage, one decimal place.
    pub success_rate: f64,
    /// `PASS`, `PARTIAL PASS` or `FAIL`
    pub overall_status: String,
    pub detailed_results: Vec<TestResult>,
}

fn result(name: &str, expected: &str, actual: String, passed: bool) -> TestResult {
    TestResult {
        test_name: name.to_string(),
        expected: expected.to_string(),
        actual,
        status: TestStatus::from_bool(passed),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ────────────────────────────────────────────────────────────────────────────
// Scorecard
// ────────────────────────────────────────────────────────────────────────────

pub fn run_validation_tests(document: &str, original_input: &str) -> TestSummary {
    let detailed_results = vec![
        integrity_preservation(document, original_input),
        structure(document),
        validation_loop_presence(document),
        criteria_extraction(document, original_input),
        token_efficiency(document, original_input),
        engineering_techniques(document),
        no_unwarranted_changes(document, original_input),
    ];

    let total_tests = detailed_results.len();
    let passed = detailed_results
        .iter()
        .filter(|r| r.status == TestStatus::Pass)
        .count();
    let failed = total_tests - passed;

    let overall_status = if passed == total_tests {
        "PASS"
    } else if passed * 2 > total_tests {
        "PARTIAL PASS"
    } else {
        "FAIL"
    };

    TestSummary {
        total_tests,
        passed,
        failed,
        success_rate: round1(passed as f64 / total_tests as f64 * 100.0),
        overall_status: overall_status.to_string(),
        detailed_results,
    }
}

fn long_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .map(String::from)
        .collect()
}

fn integrity_preservation(document: &str, original: &str) -> TestResult {
    let original_keywords = long_words(original);
    let document_keywords = long_words(document);

    let ratio = if original_keywords.is_empty() {
        1.0
    } else {
        let kept = original_keywords
            .iter()
            .filter(|w| document_keywords.contains(*w))
            .count();
        kept as f64 / original_keywords.len() as f64
    };

    result(
        "Input Integrity Preservation",
        "≥85% keyword preservation",
        format!("{}% keywords preserved", round1(ratio * 100.0)),
        ratio >= 0.85,
    )
}

fn structure(document: &str) -> TestResult {
    let required = Section::ALL.len();
    let found = required - missing_sections(document).len();
    result(
        "Structure Compliance",
        "All 9 required sections present",
        format!("{found}/{required} sections found"),
        found == required,
    )
}

fn validation_loop_presence(document: &str) -> TestResult {
    let lower = document.to_lowercase();
    let found = LOOP_INDICATORS
        .iter()
        .filter(|i| lower.contains(&i.to_lowercase()))
        .count();
    result(
        "Validation Loop Implementation",
        "≥4 loop indicators",
        format!("{found} indicators found"),
        found >= 4,
    )
}

fn criteria_extraction(document: &str, original: &str) -> TestResult {
    let in_document = sc_reference().find_iter(&document.to_lowercase()).count();
    let in_original = sc_reference().find_iter(&original.to_lowercase()).count();
    result(
        "Success Criteria Extraction",
        "All SCs from input identified",
        format!("{in_document} SC references found"),
        in_document > 0 && in_document >= in_original.max(1),
    )
}

fn token_efficiency(document: &str, original: &str) -> TestResult {
    let original_tokens = word_count(original);
    let ratio = if original_tokens == 0 {
        1.0
    } else {
        word_count(document) as f64 / original_tokens as f64
    };
    result(
        "Token Efficiency",
        "Reasonable token expansion (<3x)",
        format!("{}x expansion", round2(ratio)),
        ratio < 3.0,
    )
}

fn engineering_techniques(document: &str) -> TestResult {
    let lower = document.to_lowercase();
    let found: Vec<&str> = TECHNIQUE_PATTERNS
        .iter()
        .filter(|(_, patterns)| patterns.iter().any(|p| lower.contains(&p.to_lowercase())))
        .map(|(name, _)| *name)
        .collect();

    let listed = if found.is_empty() {
        "none".to_string()
    } else {
        found.join(", ")
    };
    result(
        "Engineering Techniques Applied",
        "≥2 techniques",
        format!("{} techniques: {listed}", found.len()),
        found.len() >= 2,
    )
}

fn no_unwarranted_changes(document: &str, original: &str) -> TestResult {
    let lower = document.to_lowercase();
    let long_sentences: Vec<&str> = sentences(original)
        .into_iter()
        .filter(|s| s.trim().chars().count() > 10)
        .collect();

    let preserved = long_sentences
        .iter()
        .filter(|s| {
            s.split_whitespace()
                .filter(|w| w.chars().count() > 4)
                .any(|w| lower.contains(&w.to_lowercase()))
        })
        .count();

    let rate = if long_sentences.is_empty() {
        1.0
    } else {
        preserved as f64 / long_sentences.len() as f64
    };
    result(
        "No Unwarranted Changes",
        "≥70% content preservation",
        format!("{}% content preserved", round1(rate * 100.0)),
        rate >= 0.7,
    )
}
