//! Optional AI refinement of rule-based output.
//!
//! The rule-based pipeline always runs first. A configured `PromptEnhancer` may then
//! refine its document; any failure other than a debounced duplicate falls back to the
//! rule-based output with the failure message attached.

pub mod cache;
pub mod client;
pub mod handlers;
pub mod prompts;
pub mod provider;
pub mod sc_guard;

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::transform::char_limit::enforce_char_limit;
use crate::transform::pipeline::{TransformOptions, TransformationResult};
use crate::transform::scorecard::{run_validation_tests, TestSummary};

use cache::EnhancementSession;
use sc_guard::{enhance_with_sc_guard, MAX_GUARD_ATTEMPTS};

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EnhancementError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid API key")]
    InvalidKey,

    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("AI service unavailable (status {0})")]
    Unavailable(u16),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("AI returned empty content")]
    EmptyContent,

    #[error("Duplicate request. Please wait.")]
    Duplicate,
}

impl EnhancementError {
    /// Whether the same request may succeed if sent again after a delay.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EnhancementError::Http(_)
                | EnhancementError::Timeout
                | EnhancementError::RateLimited { .. }
                | EnhancementError::Unavailable(_)
        )
    }

    /// Message safe to show to an end user.
    pub fn user_message(&self) -> String {
        match self {
            EnhancementError::InvalidKey => "Invalid API key. Please check your settings.".into(),
            EnhancementError::RateLimited { retry_after_secs } => format!(
                "Rate limit reached. Retry in {} seconds.",
                retry_after_secs.unwrap_or(60)
            ),
            EnhancementError::Unavailable(_) => {
                "AI service temporarily unavailable. Please try again later.".into()
            }
            EnhancementError::Timeout => "AI request timed out. Please try again.".into(),
            EnhancementError::Http(_) => {
                "Connection failed. Check your internet connection.".into()
            }
            EnhancementError::Parse(_) | EnhancementError::EmptyContent => {
                "AI returned unexpected format. Using rule-based output.".into()
            }
            EnhancementError::Duplicate => "Duplicate request. Please wait.".into(),
            EnhancementError::Api { .. } => {
                "An unexpected error occurred. Using rule-based output.".into()
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Enhancer seam
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u32,
    pub output: u32,
    pub total: u32,
}

/// One successful refinement.
#[derive(Debug, Clone, PartialEq)]
pub struct Enhancement {
    pub content: String,
    pub usage: TokenUsage,
}

const CONNECTION_TEST_INPUT: &str = "Test connection";

#[async_trait]
pub trait PromptEnhancer: Send + Sync {
    async fn enhance(
        &self,
        rule_based_output: &str,
        original_input: &str,
    ) -> Result<Enhancement, EnhancementError>;

    /// Verifies credentials and reachability. Defaults to one minimal enhancement.
    async fn test_connection(&self) -> Result<(), EnhancementError> {
        self.enhance("", CONNECTION_TEST_INPUT).await.map(|_| ())
    }

    fn provider_name(&self) -> &str;

    fn model(&self) -> &str;
}

// ────────────────────────────────────────────────────────────────────────────
// Enhanced transformation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    RuleBased,
    AiEnhanced,
}

/// Report of the AI step, present whenever enhancement was attempted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancementResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<TokenUsage>,
    pub processing_ms: u64,
    pub provider: String,
    pub model: String,
    pub fallback: bool,
    pub attempts: u32,
    pub missing_criteria: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnhancedTransformResult {
    pub output: String,
    pub method: Method,
    pub rule_based_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhancement: Option<EnhancementResult>,
    pub truncated: bool,
    pub total_processing_ms: u64,
    pub test_summary: TestSummary,
}

/// Guarded AI pass over an already computed rule-based transformation of `input_text`.
///
/// Returns `Err` only for `EnhancementError::Duplicate`; every other enhancement
/// failure is reported inside the result and the rule-based output is used.
pub async fn perform_enhanced_transformation(
    input_text: &str,
    options: &TransformOptions,
    rule_based: TransformationResult,
    enable_ai: bool,
    enhancer: Option<&dyn PromptEnhancer>,
    session: &Mutex<EnhancementSession>,
) -> Result<EnhancedTransformResult, EnhancementError> {
    let started = Instant::now();
    let augmented = match options.file_context.as_deref() {
        Some(context) => format!("{input_text}{context}"),
        None => input_text.to_string(),
    };

    let rule_based_output = rule_based.transformed_prompt;
    let rule_based_truncated = rule_based.process_details.char_limit_enforced;

    let enhancer = match enhancer {
        Some(enhancer) if enable_ai => enhancer,
        _ => {
            return Ok(EnhancedTransformResult {
                test_summary: run_validation_tests(&rule_based_output, input_text),
                output: rule_based_output.clone(),
                method: Method::RuleBased,
                rule_based_output,
                enhancement: None,
                truncated: rule_based_truncated,
                total_processing_ms: elapsed_ms(started),
            });
        }
    };

    let cached = {
        let mut session = session.lock().await;
        session.check_debounce(&augmented)?;
        session.get(&augmented)
    };

    let ai_started = Instant::now();
    let enhancement = match cached {
        Some(content) => {
            info!("Serving AI enhancement from cache");
            EnhancementResult {
                success: true,
                enhanced_prompt: Some(content),
                error: None,
                tokens_used: None,
                processing_ms: 0,
                provider: "cache".to_string(),
                model: "cache".to_string(),
                fallback: false,
                attempts: 0,
                missing_criteria: Vec::new(),
            }
        }
        None => {
            let guarded =
                enhance_with_sc_guard(enhancer, &rule_based_output, &augmented, MAX_GUARD_ATTEMPTS)
                    .await;
            match guarded {
                Ok(guarded) => {
                    let mut session = session.lock().await;
                    session.put(&augmented, &guarded.enhancement.content);
                    debug!(entries = session.len(), "Cached AI enhancement");
                    drop(session);
                    EnhancementResult {
                        success: true,
                        enhanced_prompt: Some(guarded.enhancement.content),
                        error: None,
                        tokens_used: Some(guarded.enhancement.usage),
                        processing_ms: elapsed_ms(ai_started),
                        provider: enhancer.provider_name().to_string(),
                        model: enhancer.model().to_string(),
                        fallback: false,
                        attempts: guarded.attempts,
                        missing_criteria: guarded.missing,
                    }
                }
                Err(e) => {
                    warn!("AI enhancement failed, falling back to rule-based output: {e}");
                    EnhancementResult {
                        success: false,
                        enhanced_prompt: None,
                        error: Some(e.user_message()),
                        tokens_used: None,
                        processing_ms: elapsed_ms(ai_started),
                        provider: enhancer.provider_name().to_string(),
                        model: enhancer.model().to_string(),
                        fallback: true,
                        attempts: 0,
                        missing_criteria: Vec::new(),
                    }
                }
            }
        }
    };

    let (output, method, truncated) = match enhancement.enhanced_prompt.as_deref() {
        Some(content) => {
            let output = match options.char_limit {
                Some(limit) => enforce_char_limit(content, limit),
                None => content.to_string(),
            };
            let truncated = output.chars().count() < content.chars().count();
            (output, Method::AiEnhanced, truncated)
        }
        None => (rule_based_output.clone(), Method::RuleBased, rule_based_truncated),
    };

    Ok(EnhancedTransformResult {
        test_summary: run_validation_tests(&output, input_text),
        output,
        method,
        rule_based_output,
        enhancement: Some(enhancement),
        truncated,
        total_processing_ms: elapsed_ms(started),
    })
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
