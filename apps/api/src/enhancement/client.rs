//! Chat Client — the single point of entry for remote chat-completion calls.
//!
//! Speaks the OpenAI-compatible `/chat/completions` format shared by every supported
//! provider. Retries on 429, 5xx, timeouts and transport errors with exponential
//! backoff; 401/403 fail immediately.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::enhancement::prompts::{build_enhancer_prompt, ENHANCER_SYSTEM};
use crate::enhancement::provider::Provider;
use crate::enhancement::{Enhancement, EnhancementError, PromptEnhancer, TokenUsage};

pub const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsageBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Providers name token counts either `prompt/completion` or `input/output`.
#[derive(Debug, Default, Deserialize)]
struct UsageBody {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    input_tokens: Option<u32>,
    output_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

impl From<UsageBody> for TokenUsage {
    fn from(u: UsageBody) -> Self {
        let input = u.input_tokens.or(u.prompt_tokens).unwrap_or(0);
        let output = u.output_tokens.or(u.completion_tokens).unwrap_or(0);
        TokenUsage {
            input,
            output,
            total: u.total_tokens.unwrap_or(input + output),
        }
    }
}

/// User message of the connection check.
const CONNECTION_TEST_MESSAGE: &str = "Test connection";
const CONNECTION_TEST_MAX_TOKENS: u32 = 10;

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    provider: Provider,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    retry_base_delay: Duration,
}

impl ChatClient {
    pub fn new(config: &AiConfig) -> Result<Self, EnhancementError> {
        let endpoint = match &config.base_url {
            Some(base) => format!("{}/chat/completions", base.trim_end_matches('/')),
            None => config.provider.endpoint().to_string(),
        };

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            provider: config.provider,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            retry_base_delay: BASE_DELAY,
        })
    }

    #[cfg(test)]
    fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// One system + user exchange, retried on transient failures.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
    ) -> Result<Enhancement, EnhancementError> {
        let body = self.chat_request(Some(system), user, self.max_tokens);
        let text = retry_with_backoff(MAX_ATTEMPTS, self.retry_base_delay, || self.send_once(&body))
            .await?;
        let enhancement = parse_chat_response(&text)?;

        debug!(
            provider = %self.provider,
            input_tokens = enhancement.usage.input,
            output_tokens = enhancement.usage.output,
            "Chat completion succeeded"
        );
        Ok(enhancement)
    }

    fn chat_request<'a>(
        &'a self,
        system: Option<&'a str>,
        user: &'a str,
        max_tokens: u32,
    ) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        ChatRequest {
            model: &self.model,
            messages,
            max_tokens,
            temperature: self.temperature,
        }
    }

    /// Sends `body` once and returns the raw success body.
    async fn send_once(&self, body: &ChatRequest<'_>) -> Result<String, EnhancementError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            warn!("{} returned {}: {}", self.provider, status, text);
            return Err(classify_status(status.as_u16(), &text, retry_after));
        }

        response.text().await.map_err(transport_error)
    }
}

#[async_trait]
impl PromptEnhancer for ChatClient {
    async fn enhance(
        &self,
        rule_based_output: &str,
        original_input: &str,
    ) -> Result<Enhancement, EnhancementError> {
        let user = build_enhancer_prompt(rule_based_output, original_input);
        self.complete(ENHANCER_SYSTEM, &user).await
    }

    /// A single tiny completion without retries. Only the status matters.
    async fn test_connection(&self) -> Result<(), EnhancementError> {
        let body = self.chat_request(None, CONNECTION_TEST_MESSAGE, CONNECTION_TEST_MAX_TOKENS);
        self.send_once(&body).await.map(|_| ())
    }

    fn provider_name(&self) -> &str {
        self.provider.as_str()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn transport_error(e: reqwest::Error) -> EnhancementError {
    if e.is_timeout() {
        EnhancementError::Timeout
    } else {
        EnhancementError::Http(e)
    }
}

/// Maps a non-success status and body to an error variant.
fn classify_status(status: u16, body: &str, retry_after_secs: Option<u64>) -> EnhancementError {
    match status {
        401 | 403 => EnhancementError::InvalidKey,
        429 => EnhancementError::RateLimited { retry_after_secs },
        s if s >= 500 => EnhancementError::Unavailable(s),
        _ => {
            let message = serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .or_else(|| v.get("message"))
                        .and_then(|m| m.as_str())
                        .map(String::from)
                })
                .unwrap_or_else(|| "AI request failed".to_string());
            EnhancementError::Api { status, message }
        }
    }
}

/// Extracts `choices[0].message.content` and token usage.
fn parse_chat_response(body: &str) -> Result<Enhancement, EnhancementError> {
    let response: ChatResponse = serde_json::from_str(body)?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(EnhancementError::EmptyContent)?;

    Ok(Enhancement {
        content,
        usage: response.usage.unwrap_or_default().into(),
    })
}

/// Runs `op` up to `max_attempts` times, sleeping `base_delay * 2^(n-1)` after the
/// n-th retryable failure. Non-retryable errors return immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, EnhancementError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EnhancementError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = base_delay * 2u32.pow(attempt - 1);
                warn!(
                    "Chat call attempt {} failed ({}), retrying after {}ms...",
                    attempt,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
