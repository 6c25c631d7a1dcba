use axum::{
    extract::{multipart::MultipartError, FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::enhancement::{perform_enhanced_transformation, EnhancedTransformResult};
use crate::errors::AppError;
use crate::files::{extract_file_context, format_file_context_for_prompt, FileContext};
use crate::state::AppState;
use crate::transform::char_limit::{MAX_CHAR_LIMIT, MIN_CHAR_LIMIT};
use crate::transform::pipeline::{
    transform_prompt, ProcessDetails, TransformOptions, TransformationResult,
};
use crate::transform::scorecard::{run_validation_tests, TestSummary};

pub const MIN_ITERATIONS: u32 = 1;
pub const MAX_ITERATIONS: u32 = 20;
pub const MAX_UPLOAD_FILES: usize = 5;

// ────────────────────────────────────────────────────────────────────────────
// Request / response types
// ────────────────────────────────────────────────────────────────────────────

/// Options as sent by clients; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestOptions {
    pub max_iterations: Option<u32>,
    pub include_details: Option<bool>,
    pub char_limit: Option<usize>,
    pub file_context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransformRequest {
    pub input_text: String,
    #[serde(default)]
    pub options: RequestOptions,
}

#[derive(Debug, Deserialize)]
pub struct EnhanceRequest {
    pub input_text: String,
    #[serde(default)]
    pub options: RequestOptions,
    #[serde(default)]
    pub enable_ai: bool,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub transformed_prompt: String,
    pub original_input: String,
}

#[derive(Debug, Serialize)]
pub struct TransformResponse {
    pub success: bool,
    pub transformed_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_details: Option<ProcessDetails>,
    pub test_summary: TestSummary,
    pub files_processed: usize,
    pub char_limit_applied: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub success: bool,
    pub test_summary: TestSummary,
}

/// A transform request after JSON or multipart decoding.
#[derive(Debug, Default)]
struct TransformPayload {
    input_text: String,
    options: RequestOptions,
    files: Vec<FileContext>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/transform
/// Accepts `application/json` or `multipart/form-data` with `file_*` uploads.
pub async fn handle_transform(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<TransformResponse>, AppError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let payload = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        read_multipart(multipart, state.config.max_upload_bytes).await?
    } else {
        let Json(req) = Json::<TransformRequest>::from_request(request, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        TransformPayload {
            input_text: req.input_text,
            options: req.options,
            files: Vec::new(),
        }
    };

    require_non_blank("input_text", &payload.input_text)?;
    let mut options = resolve_options(&payload.options, state.config.default_max_iterations)?;
    if !payload.files.is_empty() {
        let uploaded = format_file_context_for_prompt(&payload.files);
        options.file_context = Some(options.file_context.unwrap_or_default() + &uploaded);
    }

    info!(
        files = payload.files.len(),
        char_limit = ?options.char_limit,
        "Transform request"
    );

    let include_details = options.include_details;
    let char_limit_applied = options.char_limit;
    let input_text = payload.input_text;
    let (result, test_summary) = tokio::task::spawn_blocking(move || {
        let result = transform_prompt(&input_text, &options);
        let test_summary = run_validation_tests(&result.transformed_prompt, &input_text);
        (result, test_summary)
    })
    .await
    .map_err(|e| {
        AppError::Internal(anyhow::anyhow!("spawn_blocking failed in transform: {e}"))
    })?;

    Ok(Json(TransformResponse {
        success: true,
        process_details: include_details.then_some(result.process_details),
        transformed_prompt: result.transformed_prompt,
        test_summary,
        files_processed: payload.files.len(),
        char_limit_applied,
    }))
}

/// POST /api/v1/validate
pub async fn handle_validate(
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidateResponse>, AppError> {
    require_non_blank("transformed_prompt", &req.transformed_prompt)?;
    require_non_blank("original_input", &req.original_input)?;

    Ok(Json(ValidateResponse {
        success: true,
        test_summary: run_validation_tests(&req.transformed_prompt, &req.original_input),
    }))
}

/// POST /api/v1/enhance
pub async fn handle_enhance(
    State(state): State<AppState>,
    Json(req): Json<EnhanceRequest>,
) -> Result<Json<EnhancedTransformResult>, AppError> {
    require_non_blank("input_text", &req.input_text)?;
    let options = resolve_options(&req.options, state.config.default_max_iterations)?;

    let started = Instant::now();
    let rule_based = run_transform(req.input_text.clone(), options.clone()).await?;
    let mut result = perform_enhanced_transformation(
        &req.input_text,
        &options,
        rule_based,
        req.enable_ai,
        state.enhancer.as_deref(),
        &state.session,
    )
    .await?;
    result.total_processing_ms = started.elapsed().as_millis() as u64;

    info!(method = ?result.method, truncated = result.truncated, "Enhance request");
    Ok(Json(result))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn run_transform(
    input_text: String,
    options: TransformOptions,
) -> Result<TransformationResult, AppError> {
    tokio::task::spawn_blocking(move || transform_prompt(&input_text, &options))
        .await
        .map_err(|e| {
            AppError::Internal(anyhow::anyhow!("spawn_blocking failed in rule-based pass: {e}"))
        })
}

fn require_non_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Fills defaults, clamps `max_iterations` to `[1, 20]` and rejects a `char_limit`
/// outside `[100, 10000]`.
pub fn resolve_options(
    requested: &RequestOptions,
    default_max_iterations: u32,
) -> Result<TransformOptions, AppError> {
    if let Some(limit) = requested.char_limit {
        if !(MIN_CHAR_LIMIT..=MAX_CHAR_LIMIT).contains(&limit) {
            return Err(AppError::Validation(format!(
                "char_limit must be between {MIN_CHAR_LIMIT} and {MAX_CHAR_LIMIT}, got {limit}"
            )));
        }
    }

    let defaults = TransformOptions::default();
    Ok(TransformOptions {
        max_iterations: requested
            .max_iterations
            .unwrap_or(default_max_iterations)
            .clamp(MIN_ITERATIONS, MAX_ITERATIONS),
        include_details: requested.include_details.unwrap_or(defaults.include_details),
        char_limit: requested.char_limit,
        file_context: requested
            .file_context
            .clone()
            .filter(|c| !c.trim().is_empty()),
    })
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(e.body_text())
    }
}

/// Reads `input_text`, `char_limit`, `options` (JSON text) and `file_*` parts.
/// A top-level `char_limit` part overrides one inside `options`.
async fn read_multipart(
    mut multipart: Multipart,
    max_upload_bytes: usize,
) -> Result<TransformPayload, AppError> {
    let mut payload = TransformPayload::default();
    let mut char_limit = None;
    let mut uploads: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "input_text" => {
                payload.input_text = field.text().await.map_err(multipart_error)?;
            }
            "char_limit" => {
                let raw = field.text().await.map_err(multipart_error)?;
                if !raw.trim().is_empty() {
                    let limit = raw.trim().parse::<usize>().map_err(|_| {
                        AppError::Validation(format!("char_limit must be an integer, got '{raw}'"))
                    })?;
                    char_limit = Some(limit);
                }
            }
            "options" => {
                let raw = field.text().await.map_err(multipart_error)?;
                payload.options = serde_json::from_str(&raw)
                    .map_err(|e| AppError::Validation(format!("options is not valid JSON: {e}")))?;
            }
            n if n.starts_with("file_") => {
                if uploads.len() >= MAX_UPLOAD_FILES {
                    return Err(AppError::Validation(format!(
                        "At most {MAX_UPLOAD_FILES} files may be uploaded"
                    )));
                }
                let file_name = field.file_name().unwrap_or(n).to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.len() > max_upload_bytes {
                    return Err(AppError::PayloadTooLarge(format!(
                        "{file_name} exceeds the {max_upload_bytes} byte upload limit"
                    )));
                }
                uploads.push((file_name, bytes.to_vec()));
            }
            _ => debug!("Ignoring multipart field '{name}'"),
        }
    }

    if char_limit.is_some() {
        payload.options.char_limit = char_limit;
    }

    // PDF text extraction is CPU-bound.
    payload.files = tokio::task::spawn_blocking(move || {
        uploads
            .iter()
            .map(|(file_name, bytes)| extract_file_context(file_name, bytes))
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| {
        AppError::Internal(anyhow::anyhow!("spawn_blocking failed in file extraction: {e}"))
    })?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_configured_default_iterations() {
        let options = resolve_options(&RequestOptions::default(), 7).unwrap();
        assert_eq!(options.max_iterations, 7);
        assert!(options.include_details);
        assert_eq!(options.char_limit, None);
    }

    #[test]
    fn test_resolve_clamps_iterations() {
        let low = RequestOptions {
            max_iterations: Some(0),
            ..Default::default()
        };
        let high = RequestOptions {
            max_iterations: Some(500),
            ..Default::default()
        };
        assert_eq!(resolve_options(&low, 5).unwrap().max_iterations, 1);
        assert_eq!(resolve_options(&high, 5).unwrap().max_iterations, 20);
    }

    #[test]
    fn test_resolve_char_limit_bounds() {
        for (limit, ok) in [(99, false), (100, true), (10_000, true), (10_001, false)] {
            let requested = RequestOptions {
                char_limit: Some(limit),
                ..Default::default()
            };
            assert_eq!(resolve_options(&requested, 5).is_ok(), ok, "limit {limit}");
        }
    }

    #[test]
    fn test_resolve_drops_blank_file_context() {
        let requested = RequestOptions {
            file_context: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(resolve_options(&requested, 5).unwrap().file_context, None);
    }

    #[test]
    fn test_blank_input_is_rejected() {
        assert!(matches!(
            require_non_blank("input_text", " \n\t"),
            Err(AppError::Validation(_))
        ));
        assert!(require_non_blank("input_text", "write a poem").is_ok());
    }

    #[test]
    fn test_request_options_deserialize_partially() {
        let req: TransformRequest =
            serde_json::from_str(r#"{"input_text": "hi", "options": {"char_limit": 500}}"#)
                .unwrap();
        assert_eq!(req.options.char_limit, Some(500));
        assert_eq!(req.options.max_iterations, None);

        let req: EnhanceRequest = serde_json::from_str(r#"{"input_text": "hi"}"#).unwrap();
        assert!(!req.enable_ai);
    }
}
