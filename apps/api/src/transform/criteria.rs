//! Criteria Synthesizer — produces the ordered Success Criteria list (at most 10).
//!
//! Explicit criteria in the input always win when there are at least three of them.
//! Otherwise a fixed sequence is synthesized from the detected domain and input size.

use std::sync::OnceLock;

use regex::Regex;

use crate::transform::analyzer::InputAnalysis;
use crate::transform::domain::classify_domain;

/// Hard cap on the number of criteria carried anywhere in the pipeline.
pub const MAX_CRITERIA: usize = 10;

/// Minimum explicit criteria required before synthesis is skipped.
const MIN_EXPLICIT_CRITERIA: usize = 3;

/// Synthesized lists are padded up to this length.
const MIN_SYNTHESIZED_CRITERIA: usize = 6;

/// Inputs above this word count get the two depth criteria.
const DETAILED_INPUT_WORDS: usize = 50;

static EXPLICIT_NUMBERED: OnceLock<Regex> = OnceLock::new();
static EXPLICIT_BULLETED: OnceLock<Regex> = OnceLock::new();
static KEY_REQUIREMENT_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn explicit_numbered() -> &'static Regex {
    EXPLICIT_NUMBERED.get_or_init(|| {
        Regex::new(r"(?i)(?:SC|success\s*criteria?)\s*(\d+)\s*:\s*([^\n]+)")
            .expect("Invalid numbered criteria pattern")
    })
}

fn explicit_bulleted() -> &'static Regex {
    EXPLICIT_BULLETED.get_or_init(|| {
        Regex::new(r"(?i)[-•]\s*(?:SC|success\s*criteria?)\s*:\s*([^\n]+)")
            .expect("Invalid bulleted criteria pattern")
    })
}

fn key_requirement_patterns() -> &'static [Regex] {
    KEY_REQUIREMENT_PATTERNS.get_or_init(|| {
        [
            r"(?i)(?:must|should|needs?|require[sd]?|include)\s+([^.!?\n]+)",
            r"[-•]\s*([^.!?\n]+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("Invalid key requirement pattern"))
        .collect()
    })
}

/// Returns the ordered Success Criteria for `input`.
///
/// Deterministic for identical input. Never returns more than `MAX_CRITERIA` entries
/// and never fewer than `MIN_SYNTHESIZED_CRITERIA` when synthesis runs.
pub fn synthesize_criteria(input: &str, analysis: &InputAnalysis) -> Vec<String> {
    let explicit = extract_explicit_criteria(input);
    if explicit.len() >= MIN_EXPLICIT_CRITERIA {
        return explicit.into_iter().take(MAX_CRITERIA).collect();
    }

    let requirements = extract_key_requirements(input);
    let domain = classify_domain(input);

    let mut criteria = vec![
        "Original text preserved (no additions/removals)".to_string(),
        if requirements.is_empty() {
            "All input requirements addressed".to_string()
        } else {
            format!("All {} requirements addressed", requirements.len())
        },
        format!("{domain}-appropriate content and terminology"),
        "Clear structure with logical flow".to_string(),
        "Actionable outputs with specific guidance".to_string(),
        "Token expansion ratio <3x".to_string(),
    ];

    if analysis.word_count > DETAILED_INPUT_WORDS {
        criteria.push("Detailed context and scenario description".to_string());
        criteria.push("Comprehensive task decomposition".to_string());
    }

    if criteria.len() < MIN_SYNTHESIZED_CRITERIA {
        criteria.push("Professional quality and presentation".to_string());
        criteria.push("Validation loop completeness".to_string());
    }

    criteria.truncate(MAX_CRITERIA);
    criteria
}

/// Collects `SC<n>: ...` and `- success criteria: ...` lines, de-duplicated in order of
/// first occurrence. Matches of five characters or fewer are ignored.
pub fn extract_explicit_criteria(input: &str) -> Vec<String> {
    let numbered = explicit_numbered()
        .captures_iter(input)
        .filter_map(|c| c.get(2));
    let bulleted = explicit_bulleted()
        .captures_iter(input)
        .filter_map(|c| c.get(1));

    let mut found: Vec<(usize, String)> = numbered
        .chain(bulleted)
        .map(|m| (m.start(), m.as_str().trim().to_string()))
        .filter(|(_, text)| text.chars().count() > 5)
        .collect();
    found.sort_by_key(|(start, _)| *start);

    let mut criteria: Vec<String> = Vec::new();
    for (_, text) in found {
        if !criteria.contains(&text) {
            criteria.push(text);
        }
    }
    criteria
}

/// Requirement phrases between 11 and 99 characters, at most 10.
fn extract_key_requirements(input: &str) -> Vec<String> {
    key_requirement_patterns()
        .iter()
        .flat_map(|p| p.captures_iter(input))
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|r| (11..100).contains(&r.chars().count()))
        .take(MAX_CRITERIA)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::analyzer::analyze_input;

    fn criteria_for(input: &str) -> Vec<String> {
        synthesize_criteria(input, &analyze_input(input))
    }

    #[test]
    fn test_explicit_criteria_win_when_three_or_more() {
        let input = "Build a CLI.\nSC1: Parses all flags\nSC2: Prints usage on error\nSC3: Exits with code 2 on bad input";
        let criteria = criteria_for(input);
        assert_eq!(
            criteria,
            vec![
                "Parses all flags".to_string(),
                "Prints usage on error".to_string(),
                "Exits with code 2 on bad input".to_string(),
            ]
        );
    }

    #[test]
    fn test_explicit_criteria_are_deduplicated_and_capped() {
        let mut input = String::from("SC1: Duplicate criterion\nSC2: Duplicate criterion\n");
        for i in 3..=14 {
            input.push_str(&format!("SC{i}: Distinct criterion number {i}\n"));
        }
        let criteria = criteria_for(&input);
        assert_eq!(criteria.len(), MAX_CRITERIA);
        assert_eq!(criteria[0], "Duplicate criterion");
        assert_eq!(criteria[1], "Distinct criterion number 3");
    }

    #[test]
    fn test_bulleted_criteria_keep_document_order() {
        let input = "- success criteria: first bullet line\nSC2: second numbered line\n- SC: third bullet line";
        assert_eq!(
            extract_explicit_criteria(input),
            vec![
                "first bullet line".to_string(),
                "second numbered line".to_string(),
                "third bullet line".to_string(),
            ]
        );
    }

    #[test]
    fn test_short_explicit_matches_ignored() {
        assert!(extract_explicit_criteria("SC1: tiny").is_empty());
    }

    #[test]
    fn test_two_explicit_criteria_fall_back_to_synthesis() {
        let input = "SC1: Parses all flags\nSC2: Prints usage on error";
        let criteria = criteria_for(input);
        assert_eq!(criteria[0], "Original text preserved (no additions/removals)");
        assert_eq!(criteria.len(), 6);
    }

    #[test]
    fn test_synthesized_short_input_has_six() {
        let criteria = criteria_for("Summarize this article");
        assert_eq!(criteria.len(), 6);
        assert_eq!(criteria[1], "All input requirements addressed");
        assert_eq!(criteria[2], "General-appropriate content and terminology");
        assert_eq!(criteria[5], "Token expansion ratio <3x");
    }

    #[test]
    fn test_requirement_count_in_criteria() {
        let criteria =
            criteria_for("Draft a business plan that must include a timeline and budget");
        // "must include ..." is consumed as one phrase
        assert_eq!(criteria[1], "All 1 requirements addressed");
        assert_eq!(criteria[2], "Business-appropriate content and terminology");
    }

    #[test]
    fn test_long_input_adds_depth_criteria() {
        let input = "word ".repeat(60);
        let criteria = criteria_for(&input);
        assert_eq!(criteria.len(), 8);
        assert_eq!(criteria[6], "Detailed context and scenario description");
        assert_eq!(criteria[7], "Comprehensive task decomposition");
    }

    #[test]
    fn test_never_more_than_ten() {
        let repeated = "SC1: criterion text here\n".repeat(30);
        let long = "word ".repeat(500);
        for input in ["", "x", repeated.as_str(), long.as_str()] {
            assert!(criteria_for(input).len() <= MAX_CRITERIA);
        }
    }
}
