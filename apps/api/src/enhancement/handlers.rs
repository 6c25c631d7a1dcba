use std::time::Instant;

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{info, warn};

use crate::enhancement::provider::Provider;
use crate::state::AppState;

const NOT_CONFIGURED: &str = "AI enhancement is not configured. Set AI_PROVIDER and AI_API_KEY.";

#[derive(Debug, Serialize)]
pub struct ConfiguredProvider {
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct ProviderCatalogue {
    pub provider: Provider,
    pub default_model: &'static str,
    pub models: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub configured: Option<ConfiguredProvider>,
    pub providers: Vec<ProviderCatalogue>,
}

#[derive(Debug, Serialize)]
pub struct TestConnectionResponse {
    pub success: bool,
    pub message: String,
    pub latency_ms: u64,
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// GET /api/v1/ai/models
pub async fn handle_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let configured = state.enhancer.as_deref().map(|e| ConfiguredProvider {
        provider: e.provider_name().to_string(),
        model: e.model().to_string(),
    });

    let providers = Provider::ALL
        .iter()
        .map(|p| ProviderCatalogue {
            provider: *p,
            default_model: p.default_model(),
            models: p.models(),
        })
        .collect();

    Json(ModelsResponse {
        configured,
        providers,
    })
}

/// POST /api/v1/ai/test-connection
/// Provider failures are reported in the body with `success: false`, never as an HTTP error.
pub async fn handle_test_connection(State(state): State<AppState>) -> Json<TestConnectionResponse> {
    let Some(enhancer) = state.enhancer.as_deref() else {
        return Json(TestConnectionResponse {
            success: false,
            message: NOT_CONFIGURED.to_string(),
            latency_ms: 0,
            provider: None,
            model: None,
        });
    };

    let started = Instant::now();
    let result = enhancer.test_connection().await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let (success, message) = match result {
        Ok(()) => {
            info!(provider = enhancer.provider_name(), latency_ms, "AI connection test passed");
            (
                true,
                format!(
                    "Connected successfully to {} ({latency_ms}ms)",
                    enhancer.provider_name()
                ),
            )
        }
        Err(e) => {
            warn!(provider = enhancer.provider_name(), "AI connection test failed: {e}");
            (false, e.user_message())
        }
    };

    Json(TestConnectionResponse {
        success,
        message,
        latency_ms,
        provider: Some(enhancer.provider_name().to_string()),
        model: Some(enhancer.model().to_string()),
    })
}
