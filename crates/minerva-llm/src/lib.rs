//! Minerva LLM - model provider abstraction
//!
//! One capability, several backends: given a message transcript and an
//! optional tool catalog, return either text or a set of requested tool
//! calls. Providers:
//! - OpenAI: hosted chat-completions API (also serves any
//!   OpenAI-compatible gateway via a base URL override)
//! - Ollama: local inference, no API key
//!
//! The backend is a closed set selected once at configuration time
//! (`ProviderKind`), never re-derived per call.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod message;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod tools;

pub use completion::{
    CompletionRequest, CompletionResponse, TokenUsage, ToolCompletionRequest,
    ToolCompletionResponse,
};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use ollama::{OllamaConfig, OllamaProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use provider::{build_provider, LlmProvider, ProviderKind, ProviderSettings};
pub use tools::{ToolCall, ToolChoice, ToolDefinition};
