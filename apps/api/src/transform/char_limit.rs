//! Character Limit Enforcer — proportional per-section truncation with a hard fallback.
//!
//! Lengths are counted in `char`s, never bytes, so multi-byte text is never split
//! inside a code point.

use crate::transform::sections::Section;

pub const MIN_CHAR_LIMIT: usize = 100;
pub const MAX_CHAR_LIMIT: usize = 10_000;

const ELLIPSIS: &str = "...\n";
const ELLIPSIS_LEN: usize = 4;

/// Budget share per section, in output order. Sums to 1.0.
const SECTION_BUDGETS: [(Section, f64); 9] = [
    (Section::Context, 0.10),
    (Section::Requirements, 0.15),
    (Section::Role, 0.08),
    (Section::Objectives, 0.10),
    (Section::Instructions, 0.20),
    (Section::SuccessCriteria, 0.15),
    (Section::Constraints, 0.08),
    (Section::Validation, 0.08),
    (Section::Output, 0.06),
];

/// Returns `document` unchanged when it fits; otherwise a version of at most `limit`
/// chars. Content before the first recognised heading is dropped.
pub fn enforce_char_limit(document: &str, limit: usize) -> String {
    if document.chars().count() <= limit {
        return document.to_string();
    }

    let sections = split_sections(document);
    if sections.is_empty() {
        return hard_truncate(document, limit);
    }

    let assembled = SECTION_BUDGETS
        .iter()
        .filter_map(|(section, weight)| {
            let (_, content) = sections.iter().find(|(s, _)| s == section)?;
            let budget = (limit as f64 * weight).floor() as usize;
            Some(fit_to_budget(content.trim(), budget))
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    if assembled.chars().count() > limit {
        hard_truncate(&assembled, limit)
    } else {
        assembled.trim().to_string()
    }
}

/// Splits into named sections. A heading is a line starting with `#` that contains a
/// section marker (case-insensitive); the first marker in table order wins. Repeated
/// headings append to the section already collected.
fn split_sections(document: &str) -> Vec<(Section, String)> {
    let mut sections: Vec<(Section, String)> = Vec::new();
    let mut current: Option<usize> = None;

    for line in document.lines() {
        if let Some(section) = heading_section(line) {
            let idx = match sections.iter().position(|(s, _)| *s == section) {
                Some(idx) => idx,
                None => {
                    sections.push((section, String::new()));
                    sections.len() - 1
                }
            };
            current = Some(idx);
        }

        // preamble lines have no section and are discarded
        if let Some(idx) = current {
            let content = &mut sections[idx].1;
            content.push_str(line);
            content.push('\n');
        }
    }

    sections.retain(|(_, content)| !content.trim().is_empty());
    sections
}

fn heading_section(line: &str) -> Option<Section> {
    if !line.starts_with('#') {
        return None;
    }
    let lower = line.to_lowercase();
    SECTION_BUDGETS
        .iter()
        .map(|(section, _)| *section)
        .find(|section| lower.contains(&section.heading_marker().to_lowercase()))
}

fn fit_to_budget(content: &str, budget: usize) -> String {
    if content.chars().count() <= budget {
        return content.to_string();
    }
    let kept: String = content
        .chars()
        .take(budget.saturating_sub(ELLIPSIS_LEN))
        .collect();
    format!("{kept}{ELLIPSIS}")
}

fn hard_truncate(text: &str, limit: usize) -> String {
    let kept: String = text.chars().take(limit.saturating_sub(ELLIPSIS_LEN)).collect();
    format!("{kept}{ELLIPSIS}").trim().to_string()
}
