//! Orchestrator types: requests, outcomes, configuration.

use minerva_llm::Message;
use minerva_tools::Caller;
use serde::{Deserialize, Serialize};

/// An injected collaborator that may have failed to initialize.
///
/// Construction failures become an explicit `Unavailable` state carrying
/// the reason; the turn pipeline degrades instead of retrying.
pub enum Capability<T> {
    /// The collaborator is usable
    Ready(T),
    /// Initialization failed; the reason is surfaced in degraded replies
    Unavailable(String),
}

impl<T> Capability<T> {
    /// Ready reference, if available.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(inner) => Some(inner),
            Self::Unavailable(_) => None,
        }
    }
}

/// One message of caller-supplied conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "assistant" (anything else is treated as user input)
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Convert to a model message with the given content (the last user
    /// message is swapped for its personalized rewrite).
    #[must_use]
    pub fn to_model_message(&self, content: String) -> Message {
        match self.role.as_str() {
            "assistant" => Message::assistant(content),
            _ => Message::user(content),
        }
    }
}

/// One inbound chat turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Full conversation history, last entry is the current query
    pub messages: Vec<ChatMessage>,
    /// Authenticated caller, if any
    pub caller: Option<Caller>,
}

/// The assembled result of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Final reply text
    pub reply: String,
    /// Deduplicated cited source labels, first-seen order
    pub sources: Vec<String>,
    /// Human-readable action summaries, execution order
    pub actions: Vec<String>,
    /// Model identifier used
    pub model: String,
}

/// Turn pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Model override; empty means the provider default
    pub model: String,
    /// College name for the persona prompt
    pub college_name: String,
    /// Grounding snippets per turn
    pub top_k: usize,
    /// Completion token budget
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            college_name: "the college".to_string(),
            top_k: minerva_retrieval::DEFAULT_TOP_K,
            max_tokens: 600,
            temperature: 0.2,
        }
    }
}
