// Prompts for the AI refinement pass. The model receives the rule-based document and
// the original input and must return a refined markdown document only.

pub const ENHANCER_SYSTEM: &str = "You are a prompt engineering specialist. \
Your task is to refine and enhance an already well-structured hybrid prompt.

RULES:
1. PRESERVE all Success Criteria (SC1-SC10) - do not remove any
2. ENHANCE clarity, precision, and structure
3. IMPROVE wording for better AI comprehension
4. MAINTAIN the 9-section format (Context, Requirements, Role, Objectives, Instructions, \
Success Criteria, Constraints, Validation Loop, Output Format)
5. DO NOT add new requirements not in original input
6. DO NOT remove existing requirements
7. IMPROVE Chain-of-Thought decomposition if present
8. ENSURE validation loop is clear and executable
9. OPTIMIZE for token efficiency (aim for <3x expansion from original)
10. OUTPUT must be in markdown format

OBJECTIVE: Make the hybrid prompt even more effective while preserving its intent and structure.";

/// Heading placed above the criteria that were dropped by a previous attempt.
pub const MISSING_CRITERIA_REMINDER: &str =
    "**CRITICAL: Ensure these Success Criteria are included:**";

pub fn build_enhancer_prompt(rule_based_output: &str, original_input: &str) -> String {
    format!(
        "Original User Input:
---
{original_input}
---

Rule-Based Hybrid Prompt:
---
{rule_based_output}
---

Please enhance this hybrid prompt by:
1. Clarifying ambiguous instructions
2. Improving task decomposition
3. Strengthening success criteria definitions
4. Optimizing wording for AI comprehension
5. Ensuring logical flow and coherence

Return ONLY the enhanced hybrid prompt in markdown format."
    )
}

/// Original input followed by a reminder listing criteria the model dropped.
pub fn with_missing_criteria_reminder(original_input: &str, missing: &[String]) -> String {
    format!(
        "{original_input}\n\n{MISSING_CRITERIA_REMINDER}\n{}",
        missing.join("\n")
    )
}
