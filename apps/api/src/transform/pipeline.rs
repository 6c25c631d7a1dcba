//! Transform Pipeline — orchestrates analysis, generation, validation and post-processing.
//!
//! augment → analyze → synthesize criteria → generate → validation loop → metrics →
//! optional character limit → result assembly.
//!
//! Total for any input: callers reject blank input before calling `transform_prompt`.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::transform::analyzer::{analyze_input, InputAnalysis};
use crate::transform::char_limit::enforce_char_limit;
use crate::transform::criteria::synthesize_criteria;
use crate::transform::domain::{classify_domain, Domain};
use crate::transform::metrics::{calculate_metrics, round2, TokenMetrics};
use crate::transform::sections::{generate_document, GenerationContext, Mode, Section, TechniqueLog};
use crate::transform::validation_loop::{run_validation_loop, LoopState, DEFAULT_MAX_ITERATIONS};
use crate::transform::validator::missing_sections;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    pub max_iterations: u32,
    pub include_details: bool,
    pub char_limit: Option<usize>,
    pub file_context: Option<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            include_details: true,
            char_limit: None,
            file_context: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureCompliance {
    pub required_sections: usize,
    pub found_sections: usize,
    pub missing_sections: Vec<String>,
    /// 0.0 – 1.0
    pub compliance_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessDetails {
    pub original_analysis: InputAnalysis,
    pub sc_extraction: Vec<String>,
    pub validation_log: Vec<String>,
    pub structure_compliance: StructureCompliance,
    pub token_metrics: TokenMetrics,
    pub techniques_applied: TechniqueLog,
    pub domain: Domain,
    pub mode: Mode,
    pub iterations: u32,
    pub loop_state: LoopState,
    pub char_limit_enforced: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformationResult {
    pub transformed_prompt: String,
    pub process_details: ProcessDetails,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Transforms raw prompt text into a validated 9-section document.
pub fn transform_prompt(input_text: &str, options: &TransformOptions) -> TransformationResult {
    let input = match options.file_context.as_deref() {
        Some(context) if !context.is_empty() => format!("{input_text}{context}"),
        _ => input_text.to_string(),
    };

    let analysis = analyze_input(&input);
    let criteria = synthesize_criteria(&input, &analysis);
    let analysis = analysis.with_success_criteria(criteria.clone());
    let domain = classify_domain(&input);

    let ctx = GenerationContext::new(&input, &analysis, domain).with_original(input_text);
    let mode = ctx.mode();
    info!(
        words = analysis.word_count,
        domain = %domain,
        mode = ?mode,
        criteria = criteria.len(),
        "Transforming prompt"
    );

    let mut techniques = TechniqueLog::new();
    let first = generate_document(&ctx, &mut techniques);
    let outcome = run_validation_loop(first, &ctx, &mut techniques, options.max_iterations);

    let mut document = outcome.document;
    let mut validation_log = outcome.log;

    let interim = calculate_metrics(input_text, &document);
    validation_log.push(format!("Token metrics: {}x", interim.expansion_ratio));

    let mut char_limit_enforced = false;
    if let Some(limit) = options.char_limit {
        if document.chars().count() > limit {
            document = enforce_char_limit(&document, limit);
            validation_log.push(format!("Character limit enforced: {limit}"));
            char_limit_enforced = true;
        }
    }

    let token_metrics = calculate_metrics(input_text, &document);
    info!(
        iterations = outcome.iterations,
        state = ?outcome.state,
        expansion_ratio = token_metrics.expansion_ratio,
        techniques = ?techniques.labels(),
        "Transformation complete"
    );

    TransformationResult {
        process_details: ProcessDetails {
            original_analysis: analysis.clone(),
            sc_extraction: criteria,
            validation_log,
            structure_compliance: structure_compliance(&document),
            token_metrics,
            techniques_applied: techniques,
            domain,
            mode,
            iterations: outcome.iterations,
            loop_state: outcome.state,
            char_limit_enforced,
        },
        transformed_prompt: document,
    }
}

pub fn structure_compliance(document: &str) -> StructureCompliance {
    let missing = missing_sections(document);
    let required = Section::ALL.len();
    let found = required - missing.len();

    StructureCompliance {
        required_sections: required,
        found_sections: found,
        missing_sections: missing.into_iter().map(String::from).collect(),
        compliance_rate: round2(found as f64 / required as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKETING_PROMPT: &str = "Create a detailed marketing plan for a new eco-friendly product targeting young professionals";

    const THIRTY_WORDS: &str = "Prepare a quarterly roadmap for our mobile banking app. \
        The roadmap must include a timeline and budget, plus staffing notes, \
        dependencies, and the riskiest business assumptions we should test first.";

    #[test]
    fn test_thirty_word_input_terminates_within_budget() {
        assert_eq!(THIRTY_WORDS.split_whitespace().count(), 30);
        let options = TransformOptions {
            max_iterations: 5,
            ..Default::default()
        };
        let result = transform_prompt(THIRTY_WORDS, &options);
        let details = &result.process_details;
        assert!(details.iterations <= 5);
        assert!(matches!(
            details.loop_state,
            LoopState::Converged | LoopState::MaxIterationsReached
        ));
        assert_eq!(details.loop_state, LoopState::Converged);
        assert_eq!(details.mode, Mode::Medium);
    }

    #[test]
    fn test_marketing_prompt_is_preserved_and_compliant() {
        let result = transform_prompt(MARKETING_PROMPT, &TransformOptions::default());
        assert!(result.transformed_prompt.contains(MARKETING_PROMPT));
        let compliance = &result.process_details.structure_compliance;
        assert_eq!(compliance.found_sections, 9);
        assert_eq!(compliance.compliance_rate, 1.0);
        assert!(compliance.missing_sections.is_empty());
        assert_eq!(result.process_details.domain, Domain::Business);
    }

    #[test]
    fn test_log_lines_in_order() {
        let result = transform_prompt(MARKETING_PROMPT, &TransformOptions::default());
        let log = &result.process_details.validation_log;
        assert_eq!(log[0], "Start validation (max 5)");
        assert_eq!(log[1], "Iter 1: Checking SCs");
        assert!(log.iter().any(|l| l.starts_with("✓ Complete")));
        assert!(log.last().is_some_and(|l| l.starts_with("Token metrics: ")));
    }

    #[test]
    fn test_char_limit_is_applied_and_logged() {
        let options = TransformOptions {
            char_limit: Some(300),
            ..Default::default()
        };
        let result = transform_prompt(MARKETING_PROMPT, &options);
        assert!(result.transformed_prompt.chars().count() <= 300);
        assert!(result
            .process_details
            .validation_log
            .contains(&"Character limit enforced: 300".to_string()));
        assert!(result.process_details.char_limit_enforced);
    }

    #[test]
    fn test_generous_char_limit_is_not_logged() {
        let options = TransformOptions {
            char_limit: Some(10_000),
            ..Default::default()
        };
        let result = transform_prompt("Summarize this article", &options);
        assert!(!result
            .process_details
            .validation_log
            .iter()
            .any(|l| l.starts_with("Character limit")));
    }

    const QUARTERLY_FILE_CONTEXT: &str = "\n\n--- Additional Context from Uploaded Files ---\n\n\
        File: a.txt\nText File:\nsecret appendix words";

    #[test]
    fn test_file_context_drives_analysis_but_not_the_echo() {
        let input = "Summarize the quarterly report";
        let options = TransformOptions {
            file_context: Some(QUARTERLY_FILE_CONTEXT.to_string()),
            ..Default::default()
        };
        let result = transform_prompt(input, &options);
        let document = &result.transformed_prompt;

        let requirements = document
            .split("\n\n# ")
            .find_map(|section| section.strip_prefix("Requirements\n"))
            .unwrap();
        assert_eq!(requirements, input);
        assert!(!document.contains("secret appendix words"));

        let details = &result.process_details;
        assert_eq!(details.token_metrics.original_tokens, 4);
        assert!(details.original_analysis.word_count > 4);
        assert_eq!(details.loop_state, LoopState::Converged);
    }

    #[test]
    fn test_structure_compliance_of_partial_document() {
        let compliance = structure_compliance("# Context\n# Role\n# Requirements");
        assert_eq!(compliance.found_sections, 3);
        assert_eq!(compliance.compliance_rate, 0.33);
        assert_eq!(compliance.missing_sections[0], "objectives");
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let a = transform_prompt(THIRTY_WORDS, &TransformOptions::default());
        let b = transform_prompt(THIRTY_WORDS, &TransformOptions::default());
        assert_eq!(a.transformed_prompt, b.transformed_prompt);
    }
}
