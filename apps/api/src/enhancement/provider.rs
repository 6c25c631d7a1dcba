//! Supported chat-completion providers. All three speak the OpenAI wire format and
//! authenticate with a bearer token; only the endpoint and model catalogue differ.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    Perplexity,
    Glm4,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown AI provider '{0}' (expected openai, perplexity or glm4)")]
pub struct UnknownProvider(pub String);

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Perplexity, Provider::Glm4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Perplexity => "perplexity",
            Provider::Glm4 => "glm4",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1/chat/completions",
            Provider::Perplexity => "https://api.perplexity.ai/chat/completions",
            Provider::Glm4 => "https://api.z.ai/api/paas/v4/chat/completions",
        }
    }

    pub fn models(&self) -> &'static [&'static str] {
        match self {
            Provider::OpenAi => &["gpt-4", "gpt-3.5-turbo", "gpt-4-turbo", "gpt-4o", "gpt-4o-mini"],
            Provider::Perplexity => &[
                "sonar",
                "sonar-pro",
                "sonar-reasoning",
                "sonar-reasoning-pro",
                "sonar-deep-research",
            ],
            Provider::Glm4 => &["glm-4", "glm-4-plus"],
        }
    }

    /// Model used when `AI_MODEL` is not set.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Perplexity => "sonar",
            Provider::Glm4 => "glm-4",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "perplexity" => Ok(Provider::Perplexity),
            "glm4" => Ok(Provider::Glm4),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}
