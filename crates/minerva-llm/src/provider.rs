//! Provider capability trait and configuration-time selection.

use crate::completion::{CompletionRequest, CompletionResponse, ToolCompletionRequest, ToolCompletionResponse};
use crate::error::{Error, Result};
use crate::ollama::{OllamaConfig, OllamaProvider};
use crate::openai::{OpenAiConfig, OpenAiProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The model-provider capability: given a transcript and an optional tool
/// catalog, return either text or a set of requested tool calls.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Check if the provider supports function calling/tools
    fn supports_tools(&self) -> bool;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Complete a conversation (text only)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Complete a conversation with tools
    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse>;
}

/// Closed set of provider backends, selected once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Hosted OpenAI-compatible chat completions API
    OpenAi,
    /// Local Ollama instance
    Ollama,
}

impl std::str::FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(Error::NotConfigured(format!(
                "unknown provider kind {other:?} (expected \"openai\" or \"ollama\")"
            ))),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// Settings for building a provider at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Which backend to use
    pub kind: ProviderKind,
    /// API key (required for hosted providers)
    pub api_key: Option<String>,
    /// Base URL override (OpenAI-compatible gateways, non-default Ollama)
    pub base_url: Option<String>,
    /// Model override
    pub model: Option<String>,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            api_key: None,
            base_url: None,
            model: None,
            timeout_ms: 60_000,
        }
    }
}

/// Build the configured provider.
///
/// Fails fast with `Error::NotConfigured` when a hosted backend is
/// selected without credentials; callers turn that into a degraded
/// state instead of retrying.
pub fn build_provider(settings: &ProviderSettings) -> Result<Arc<dyn LlmProvider>> {
    let timeout = Duration::from_millis(settings.timeout_ms);

    let provider: Arc<dyn LlmProvider> = match settings.kind {
        ProviderKind::OpenAi => {
            let api_key = settings
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| Error::NotConfigured("missing OpenAI API key".into()))?;
            let mut config = OpenAiConfig::new(api_key).with_timeout(timeout);
            if let Some(url) = &settings.base_url {
                config = config.with_base_url(url);
            }
            if let Some(model) = &settings.model {
                config = config.with_model(model);
            }
            Arc::new(OpenAiProvider::new(config)?)
        }
        ProviderKind::Ollama => {
            let mut config = OllamaConfig::default().with_timeout(timeout);
            if let Some(url) = &settings.base_url {
                config = config.with_base_url(url);
            }
            if let Some(model) = &settings.model {
                config = config.with_model(model);
            }
            Arc::new(OllamaProvider::new(config)?)
        }
    };

    info!(
        provider = provider.name(),
        model = provider.default_model(),
        "LLM provider configured"
    );
    Ok(provider)
}
