//! Input Analyzer — structural statistics and literal phrase harvesting for raw prompt text.
//!
//! Pure pattern matching over free text. There is no grammar for arbitrary prompts, so
//! extraction is a short ordered list of regex rules per category.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Data model
// ────────────────────────────────────────────────────────────────────────────

/// Statistics and extracted phrases for one transform call.
///
/// Built once by `analyze_input`. `success_criteria` starts as the literally extracted
/// criteria and is replaced by the synthesized list via `with_success_criteria`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputAnalysis {
    pub word_count: usize,
    pub sentence_count: usize,
    pub line_count: usize,
    pub success_criteria: Vec<String>,
    pub requirements: Vec<String>,
    pub objectives: Vec<String>,
    /// 0 – 100
    pub complexity: u32,
}

impl InputAnalysis {
    /// Returns the analysis with its criteria list replaced.
    pub fn with_success_criteria(mut self, criteria: Vec<String>) -> Self {
        self.success_criteria = criteria;
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Patterns
// ────────────────────────────────────────────────────────────────────────────

static SUCCESS_CRITERIA_PATTERN: OnceLock<Regex> = OnceLock::new();
static REQUIREMENT_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
static OBJECTIVE_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
static SENTENCE_TERMINATORS: OnceLock<Regex> = OnceLock::new();

fn success_criteria_pattern() -> &'static Regex {
    SUCCESS_CRITERIA_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(success\s*criteria?\s*\d*|sc\s*\d+)\s*:\s*(.+)")
            .expect("Invalid success criteria pattern")
    })
}

fn requirement_patterns() -> &'static [Regex] {
    REQUIREMENT_PATTERNS.get_or_init(|| {
        [
            r"(?i)require[sd]?\s*:\s*(.+)",
            r"(?i)must\s+(.+)",
            r"(?i)should\s+(.+)",
            r"(?i)needs?\s+to\s+(.+)",
            r"(?i)include\s+(.+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("Invalid requirement pattern"))
        .collect()
    })
}

fn objective_patterns() -> &'static [Regex] {
    OBJECTIVE_PATTERNS.get_or_init(|| {
        [
            r"(?i)objectives?\s*:\s*(.+)",
            r"(?i)goals?\s*:\s*(.+)",
            r"(?i)aims?\s*:\s*(.+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("Invalid objective pattern"))
        .collect()
    })
}

fn sentence_terminators() -> &'static Regex {
    SENTENCE_TERMINATORS
        .get_or_init(|| Regex::new(r"[.!?]+").expect("Invalid sentence terminator pattern"))
}

// ────────────────────────────────────────────────────────────────────────────
// Counting helpers (shared by every component that approximates tokens)
// ────────────────────────────────────────────────────────────────────────────

/// Whitespace-delimited word count. This is the crate-wide token approximation.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Non-blank fragments between `.`, `!` and `?` runs.
pub fn sentences(text: &str) -> Vec<&str> {
    sentence_terminators()
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Analysis
// ────────────────────────────────────────────────────────────────────────────

/// Analyzes raw input text. Never fails; an empty string yields all-zero counts.
pub fn analyze_input(text: &str) -> InputAnalysis {
    let success_criteria = success_criteria_pattern()
        .captures_iter(text)
        .filter_map(|c| c.get(2).map(|m| m.as_str().trim().to_string()))
        .collect();

    InputAnalysis {
        word_count: word_count(text),
        sentence_count: sentences(text).len(),
        line_count: text.lines().filter(|l| !l.trim().is_empty()).count(),
        success_criteria,
        requirements: harvest(text, requirement_patterns()),
        objectives: harvest(text, objective_patterns()),
        complexity: complexity(text),
    }
}

/// Runs each pattern in order and collects the non-empty first capture group.
fn harvest(text: &str, patterns: &[Regex]) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|p| p.captures_iter(text))
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// `min(100, round(avg_word_len * 5 + avg_sentence_len * 2))`
fn complexity(text: &str) -> u32 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 0;
    }

    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
    let avg_word_len = total_chars as f64 / words.len() as f64;
    let avg_sentence_len = words.len() as f64 / sentences(text).len().max(1) as f64;

    ((avg_word_len * 5.0 + avg_sentence_len * 2.0).round() as u32).min(100)
}
