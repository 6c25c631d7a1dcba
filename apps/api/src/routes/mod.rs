pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::enhancement::handlers as ai_handlers;
use crate::state::AppState;
use crate::transform::handlers::{self, MAX_UPLOAD_FILES};

/// Headroom for the non-file multipart parts and JSON bodies.
const BODY_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_mul(MAX_UPLOAD_FILES)
        .saturating_add(BODY_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/transform", post(handlers::handle_transform))
        .route("/api/v1/validate", post(handlers::handle_validate))
        .route("/api/v1/enhance", post(handlers::handle_enhance))
        .route("/api/v1/ai/models", get(ai_handlers::handle_models))
        .route(
            "/api/v1/ai/test-connection",
            post(ai_handlers::handle_test_connection),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::enhancement::{Enhancement, EnhancementError, PromptEnhancer, TokenUsage};

    const PROMPT: &str = "Write a launch plan for a new fitness tracking app aimed at busy \
        parents. It must include a timeline and budget, and it should highlight the riskiest \
        assumptions so the team can test them first.";

    const BOUNDARY: &str = "hybridpromptboundary";

    /// Returns the rule-based document unchanged.
    struct EchoEnhancer;

    #[async_trait]
    impl PromptEnhancer for EchoEnhancer {
        async fn enhance(
            &self,
            rule_based_output: &str,
            _original_input: &str,
        ) -> Result<Enhancement, EnhancementError> {
            Ok(Enhancement {
                content: rule_based_output.to_string(),
                usage: TokenUsage::default(),
            })
        }

        fn provider_name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }
    }

    fn app() -> Router {
        build_router(AppState::new(Config::for_tests(), None))
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        read_json(response).await
    }

    async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    /// (name, filename, content) parts; `filename` marks a file part.
    fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> String {
        let mut body = String::new();
        for (name, filename, content) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    async fn post_multipart(app: Router, body: String) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/transform")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        read_json(response).await
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let (status, json) = read_json(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "hybrid-prompt-api");
    }

    #[tokio::test]
    async fn test_transform_json() {
        let (status, json) =
            post_json(app(), "/api/v1/transform", json!({ "input_text": PROMPT })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert!(json["transformed_prompt"].as_str().unwrap().contains(PROMPT));
        assert_eq!(json["process_details"]["loop_state"], "converged");
        assert_eq!(json["test_summary"]["total_tests"], 7);
        assert_eq!(json["files_processed"], 0);
        assert_eq!(json["char_limit_applied"], Value::Null);
    }

    #[tokio::test]
    async fn test_transform_without_details() {
        let body = json!({ "input_text": PROMPT, "options": { "include_details": false } });
        let (status, json) = post_json(app(), "/api/v1/transform", body).await;

        assert_eq!(status, StatusCode::OK);
        assert!(json.get("process_details").is_none());
    }

    #[tokio::test]
    async fn test_transform_rejects_blank_input() {
        let (status, json) =
            post_json(app(), "/api/v1/transform", json!({ "input_text": "   " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_transform_rejects_out_of_range_char_limit() {
        let body = json!({ "input_text": PROMPT, "options": { "char_limit": 50 } });
        let (status, _) = post_json(app(), "/api/v1/transform", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_transform_multipart_with_file() {
        let body = multipart_body(&[
            ("input_text", None, PROMPT),
            ("char_limit", None, "800"),
            ("file_1", Some("notes.txt"), "Budget is 20k."),
        ]);
        let (status, json) = post_multipart(app(), body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["files_processed"], 1);
        assert_eq!(json["char_limit_applied"], 800);
        let prompt = json["transformed_prompt"].as_str().unwrap();
        assert!(prompt.chars().count() <= 800);
        assert_eq!(json["process_details"]["char_limit_enforced"], true);
    }

    #[tokio::test]
    async fn test_transform_multipart_keeps_uploads_out_of_requirements() {
        let body = multipart_body(&[
            ("input_text", None, "Summarize the quarterly report"),
            ("file_1", Some("q3.md"), "Revenue grew 12%."),
        ]);
        let (status, json) = post_multipart(app(), body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["files_processed"], 1);
        let prompt = json["transformed_prompt"].as_str().unwrap();
        let requirements = prompt
            .split("\n\n# ")
            .find_map(|s| s.strip_prefix("Requirements\n"))
            .unwrap();
        assert_eq!(requirements, "Summarize the quarterly report");
        assert!(!prompt.contains("Revenue grew 12%."));
        assert_eq!(json["process_details"]["token_metrics"]["original_tokens"], 4);
    }

    #[tokio::test]
    async fn test_transform_multipart_rejects_oversized_file() {
        let big = "x".repeat(100);
        let body = multipart_body(&[
            ("input_text", None, PROMPT),
            ("file_1", Some("big.txt"), &big),
        ]);
        let (status, json) = post_multipart(app(), body).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_validate() {
        let body = json!({
            "transformed_prompt": "# Context\nSC1: a\nSC2: b\nSC3: c",
            "original_input": "a short request",
        });
        let (status, json) = post_json(app(), "/api/v1/validate", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["test_summary"]["total_tests"], 7);

        let body = json!({ "transformed_prompt": "", "original_input": "x" });
        let (status, _) = post_json(app(), "/api/v1/validate", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_enhance_without_provider_is_rule_based() {
        let body = json!({ "input_text": PROMPT, "enable_ai": true });
        let (status, json) = post_json(app(), "/api/v1/enhance", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["method"], "rule-based");
        assert_eq!(json["output"], json["rule_based_output"]);
    }

    #[tokio::test]
    async fn test_enhance_duplicate_is_rate_limited() {
        let enhancer: Arc<dyn PromptEnhancer> = Arc::new(EchoEnhancer);
        let app = build_router(AppState::new(Config::for_tests(), Some(enhancer)));
        let body = json!({ "input_text": PROMPT, "enable_ai": true });

        let (status, json) = post_json(app.clone(), "/api/v1/enhance", body.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["method"], "ai-enhanced");

        let (status, json) = post_json(app, "/api/v1/enhance", body).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json["error"]["code"], "RATE_LIMITED");
    }

    #[tokio::test]
    async fn test_ai_models_catalogue() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/ai/models")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let (status, json) = read_json(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["configured"], Value::Null);
        assert_eq!(json["providers"][0]["provider"], "openai");
        assert_eq!(json["providers"][0]["default_model"], "gpt-4o-mini");
        assert_eq!(json["providers"][2]["models"], json!(["glm-4", "glm-4-plus"]));
    }

    #[tokio::test]
    async fn test_ai_test_connection_with_provider() {
        let enhancer: Arc<dyn PromptEnhancer> = Arc::new(EchoEnhancer);
        let app = build_router(AppState::new(Config::for_tests(), Some(enhancer)));
        let (status, json) = post_json(app, "/api/v1/ai/test-connection", json!({})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["provider"], "echo");
        assert!(json["message"]
            .as_str()
            .unwrap()
            .starts_with("Connected successfully to echo"));
    }
}
