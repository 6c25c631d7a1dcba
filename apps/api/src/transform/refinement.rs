//! Refinement Engine — produces the next candidate document from a failed verdict.
//!
//! Only two failures are corrected:
//! - a Structure failure regenerates the whole document (and wins over anything else)
//! - an SC count failure re-renders the Success Criteria section from the full list
//!
//! Content preservation, technique and pseudocode failures pass through unchanged.

use crate::transform::sections::{
    generate_document, render_criteria_lines, GenerationContext, TechniqueLog,
};
use crate::transform::validator::{UnmetCriterion, ValidationVerdict};

const CRITERIA_HEADING: &str = "# Success Criteria";

/// Returns the revised document for the next loop iteration.
pub fn refine_document(
    current: &str,
    verdict: &ValidationVerdict,
    ctx: &GenerationContext<'_>,
    log: &mut TechniqueLog,
) -> String {
    let structure_failed = verdict
        .unmet
        .iter()
        .any(|u| matches!(u, UnmetCriterion::Structure { .. }));
    if structure_failed {
        return generate_document(ctx, log);
    }

    let sc_count_failed = verdict
        .unmet
        .iter()
        .any(|u| matches!(u, UnmetCriterion::ScCount { .. }));
    if sc_count_failed {
        return replace_criteria_section(current, ctx.original, &ctx.analysis.success_criteria);
    }

    current.to_string()
}

/// Replaces the body between `# Success Criteria` and the next top-level heading.
///
/// The heading is searched for after the Requirements `echo`, so a heading inside the
/// caller's own text is never rewritten. A document without the heading is returned
/// unchanged.
fn replace_criteria_section(document: &str, echo: &str, criteria: &[String]) -> String {
    let search_from = document.find(echo).map_or(0, |i| i + echo.len());
    let Some(offset) = document[search_from..].find(CRITERIA_HEADING) else {
        return document.to_string();
    };
    let start = search_from + offset;

    let body_start = start + CRITERIA_HEADING.len();
    let section = format!("{CRITERIA_HEADING}\n{}", render_criteria_lines(criteria));

    match document[body_start..].find("\n# ") {
        Some(offset) => {
            let rest = &document[body_start + offset + 1..];
            format!("{}{section}\n\n{rest}", &document[..start])
        }
        None => format!("{}{section}", &document[..start]),
    }
}
