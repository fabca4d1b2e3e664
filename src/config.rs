//! Settings, loaded once at startup.
//!
//! Layering: optional `config/default.toml` under `MINERVA_`-prefixed
//! environment variables (`MINERVA_SERVER__PORT=9000` style), with `.env`
//! loaded by the binary before this runs. No component reads the
//! environment at request time.

use minerva_llm::{ProviderKind, ProviderSettings};
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// HTTP listener
    #[serde(default)]
    pub server: ServerSettings,
    /// SQLite database
    #[serde(default)]
    pub database: DatabaseSettings,
    /// Token issuing/verification
    #[serde(default)]
    pub auth: AuthSettings,
    /// Model provider
    #[serde(default)]
    pub provider: ProviderSection,
    /// Vector index
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    /// Chat persona and sampling
    #[serde(default)]
    pub chat: ChatSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/minerva.db"),
        }
    }
}

/// Auth settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Token lifetime in hours
    pub token_expiry_hours: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            token_expiry_hours: 24,
        }
    }
}

/// Model provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSection {
    /// Backend: "openai" or "ollama"
    pub kind: String,
    /// API key for hosted backends
    pub api_key: Option<String>,
    /// Base URL override
    pub base_url: Option<String>,
    /// Model override
    pub model: Option<String>,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            kind: "openai".to_string(),
            api_key: None,
            base_url: None,
            model: None,
            timeout_ms: 60_000,
        }
    }
}

impl ProviderSection {
    /// Convert to provider-build settings. Fails on an unknown kind.
    pub fn to_provider_settings(&self) -> minerva_llm::Result<ProviderSettings> {
        Ok(ProviderSettings {
            kind: ProviderKind::from_str(&self.kind)?,
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            timeout_ms: self.timeout_ms,
        })
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalSettings {
    /// Chroma server URL
    pub chroma_url: String,
    /// Per-query timeout in milliseconds
    pub timeout_ms: u64,
    /// Grounding snippets per turn
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chroma_url: "http://localhost:8001".to_string(),
            timeout_ms: 10_000,
            top_k: 4,
        }
    }
}

/// Chat settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSettings {
    /// College name used in the persona prompt
    pub college_name: String,
    /// Completion token budget
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            college_name: "Minerva College".to_string(),
            max_tokens: 600,
            temperature: 0.2,
        }
    }
}

impl Settings {
    /// Load settings from `config/default.toml` (optional) and the
    /// environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("MINERVA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.retrieval.top_k, 4);
        assert_eq!(settings.auth.token_expiry_hours, 24);
        assert_eq!(settings.provider.kind, "openai");
    }

    #[test]
    fn test_provider_section_conversion() {
        let section = ProviderSection {
            kind: "ollama".to_string(),
            ..Default::default()
        };
        let provider = section.to_provider_settings().unwrap();
        assert_eq!(provider.kind, minerva_llm::ProviderKind::Ollama);

        let bad = ProviderSection {
            kind: "mystery".to_string(),
            ..Default::default()
        };
        assert!(bad.to_provider_settings().is_err());
    }
}
