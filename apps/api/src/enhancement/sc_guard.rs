//! Success-criteria guard around an enhancer: every `SC<n>` line of the original input
//! must survive refinement, otherwise the enhancer is asked again with a reminder.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{info, warn};

use crate::enhancement::prompts::with_missing_criteria_reminder;
use crate::enhancement::{Enhancement, EnhancementError, PromptEnhancer};

pub const MAX_GUARD_ATTEMPTS: u32 = 3;

static SC_LINE: OnceLock<Regex> = OnceLock::new();

fn sc_line() -> &'static Regex {
    SC_LINE.get_or_init(|| Regex::new(r"(?i)SC\d+:?\s*[^\n]+").expect("Invalid SC line pattern"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessCriterion {
    /// `SC<n>` numbered by order of appearance, not by the number in the text.
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct GuardedEnhancement {
    pub enhancement: Enhancement,
    pub attempts: u32,
    /// Ids still missing after the final attempt. Empty on full preservation.
    pub missing: Vec<String>,
}

pub fn extract_success_criteria(text: &str) -> Vec<SuccessCriterion> {
    sc_line()
        .find_iter(text)
        .enumerate()
        .map(|(i, m)| SuccessCriterion {
            id: format!("SC{}", i + 1),
            text: m.as_str().trim().to_string(),
        })
        .collect()
}

/// Criteria whose id and text are both absent from `output` (case-insensitive).
pub fn missing_criteria<'a>(
    criteria: &'a [SuccessCriterion],
    output: &str,
) -> Vec<&'a SuccessCriterion> {
    let lower = output.to_lowercase();
    criteria
        .iter()
        .filter(|sc| {
            !lower.contains(&sc.id.to_lowercase()) && !lower.contains(&sc.text.to_lowercase())
        })
        .collect()
}

/// Runs `enhancer` until all criteria of `original_input` are preserved or
/// `max_attempts` is used up. Each retry refines the previous attempt's output.
pub async fn enhance_with_sc_guard(
    enhancer: &dyn PromptEnhancer,
    rule_based_output: &str,
    original_input: &str,
    max_attempts: u32,
) -> Result<GuardedEnhancement, EnhancementError> {
    let criteria = extract_success_criteria(original_input);
    if criteria.is_empty() {
        let enhancement = enhancer.enhance(rule_based_output, original_input).await?;
        return Ok(GuardedEnhancement {
            enhancement,
            attempts: 1,
            missing: Vec::new(),
        });
    }

    let mut document = rule_based_output.to_string();
    let mut input = original_input.to_string();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let enhancement = enhancer.enhance(&document, &input).await?;
        let missing = missing_criteria(&criteria, &enhancement.content);

        if missing.is_empty() {
            info!(attempt, "All success criteria preserved");
            return Ok(GuardedEnhancement {
                enhancement,
                attempts: attempt,
                missing: Vec::new(),
            });
        }

        let ids: Vec<String> = missing.iter().map(|sc| sc.id.clone()).collect();
        warn!(attempt, missing = ?ids, "Enhancement dropped success criteria");

        if attempt >= max_attempts {
            return Ok(GuardedEnhancement {
                enhancement,
                attempts: attempt,
                missing: ids,
            });
        }

        let reminder: Vec<String> = missing.iter().map(|sc| sc.text.clone()).collect();
        input = with_missing_criteria_reminder(original_input, &reminder);
        document = enhancement.content;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::enhancement::TokenUsage;

    /// Replays canned outputs in order and records the inputs it was given.
    struct ScriptedEnhancer {
        outputs: Vec<&'static str>,
        seen_inputs: Mutex<Vec<String>>,
    }

    impl ScriptedEnhancer {
        fn new(outputs: Vec<&'static str>) -> Self {
            Self {
                outputs,
                seen_inputs: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PromptEnhancer for ScriptedEnhancer {
        async fn enhance(
            &self,
            _rule_based_output: &str,
            original_input: &str,
        ) -> Result<Enhancement, EnhancementError> {
            let mut seen = self.seen_inputs.lock().unwrap();
            seen.push(original_input.to_string());
            let idx = (seen.len() - 1).min(self.outputs.len() - 1);
            Ok(Enhancement {
                content: self.outputs[idx].to_string(),
                usage: TokenUsage::default(),
            })
        }

        fn provider_name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    const INPUT: &str = "Build a parser.\nSC1: Handles empty input\nSC2: Reports line numbers";

    #[test]
    fn test_extracts_criteria_in_order() {
        let criteria = extract_success_criteria(INPUT);
        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria[0].id, "SC1");
        assert_eq!(criteria[0].text, "SC1: Handles empty input");
        assert_eq!(criteria[1].id, "SC2");
    }

    #[test]
    fn test_missing_by_id_or_text() {
        let criteria = extract_success_criteria(INPUT);
        let missing = missing_criteria(&criteria, "see sc1 for details");
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, "SC2");
    }

    #[tokio::test]
    async fn test_first_attempt_preserves_everything() {
        let enhancer = ScriptedEnhancer::new(vec!["SC1 and SC2 kept"]);
        let guarded = enhance_with_sc_guard(&enhancer, "doc", INPUT, MAX_GUARD_ATTEMPTS)
            .await
            .unwrap();
        assert_eq!(guarded.attempts, 1);
        assert!(guarded.missing.is_empty());
    }

    #[tokio::test]
    async fn test_retries_with_reminder_until_preserved() {
        let enhancer = ScriptedEnhancer::new(vec!["only SC1", "SC1 and SC2"]);
        let guarded = enhance_with_sc_guard(&enhancer, "doc", INPUT, MAX_GUARD_ATTEMPTS)
            .await
            .unwrap();

        assert_eq!(guarded.attempts, 2);
        let seen = enhancer.seen_inputs.lock().unwrap();
        assert!(seen[1].contains("**CRITICAL: Ensure these Success Criteria are included:**"));
        assert!(seen[1].ends_with("SC2: Reports line numbers"));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let enhancer = ScriptedEnhancer::new(vec!["nothing preserved"]);
        let guarded = enhance_with_sc_guard(&enhancer, "doc", INPUT, MAX_GUARD_ATTEMPTS)
            .await
            .unwrap();

        assert_eq!(guarded.attempts, 3);
        assert_eq!(guarded.missing, vec!["SC1".to_string(), "SC2".to_string()]);
        assert_eq!(enhancer.seen_inputs.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_input_without_criteria_calls_once() {
        let enhancer = ScriptedEnhancer::new(vec!["anything"]);
        let guarded = enhance_with_sc_guard(&enhancer, "doc", "plain request", MAX_GUARD_ATTEMPTS)
            .await
            .unwrap();
        assert_eq!(guarded.attempts, 1);
    }
}
