use anyhow::{Context, Result};

use crate::enhancement::provider::Provider;

/// Application configuration loaded from environment variables.
/// Startup fails if a value is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub default_max_iterations: u32,
    pub max_upload_bytes: usize,
    pub cache_capacity: usize,
    pub cache_ttl_secs: i64,
    pub debounce_ms: i64,
    /// `None` disables AI enhancement.
    pub ai: Option<AiConfig>,
}

/// Remote enhancer settings. Only built when `AI_PROVIDER` is set.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Overrides the provider's API base, e.g. for a proxy. `/chat/completions` is appended.
    pub base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", "8080").context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            default_max_iterations: parse_env("DEFAULT_MAX_ITERATIONS", "5")?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", "10485760")?,
            cache_capacity: parse_env("AI_CACHE_CAPACITY", "100")?,
            cache_ttl_secs: parse_env("AI_CACHE_TTL_SECS", "3600")?,
            debounce_ms: parse_env("AI_DEBOUNCE_MS", "2000")?,
            ai: ai_from_env()?,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Defaults with AI disabled and a small upload cap.
    pub fn for_tests() -> Self {
        Config {
            port: 0,
            rust_log: "info".into(),
            default_max_iterations: 5,
            max_upload_bytes: 64,
            cache_capacity: 10,
            cache_ttl_secs: 60,
            debounce_ms: 2000,
            ai: None,
        }
    }
}

fn ai_from_env() -> Result<Option<AiConfig>> {
    let Ok(name) = std::env::var("AI_PROVIDER") else {
        return Ok(None);
    };
    if name.trim().is_empty() {
        return Ok(None);
    }

    let provider: Provider = name.parse()?;
    Ok(Some(AiConfig {
        provider,
        api_key: require_env("AI_API_KEY")?,
        model: std::env::var("AI_MODEL").unwrap_or_else(|_| provider.default_model().to_string()),
        max_tokens: parse_env("AI_MAX_TOKENS", "4000")?,
        temperature: parse_env("AI_TEMPERATURE", "0.7")?,
        timeout_secs: parse_env("AI_TIMEOUT_SECS", "30")?,
        base_url: std::env::var("AI_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty()),
    }))
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads `key` (or `default` when unset) and parses it.
fn parse_env<T>(key: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u32 = parse_env("HYBRID_PROMPT_TEST_UNSET_VAR", "17").unwrap();
        assert_eq!(value, 17);
    }

    #[test]
    fn test_parse_env_rejects_malformed_default() {
        let result: Result<u16> = parse_env("HYBRID_PROMPT_TEST_UNSET_VAR", "not-a-port");
        let message = result.unwrap_err().to_string();
        assert!(message.contains("HYBRID_PROMPT_TEST_UNSET_VAR"));
    }
}
