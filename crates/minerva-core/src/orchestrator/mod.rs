//! Orchestrator - drives one chat turn from raw message to grounded reply.
//!
//! Per-turn pipeline: personalize the query with the caller identity,
//! retrieve grounding context, first model pass with the tool catalog,
//! execute requested tools in order through the dispatcher, one follow-up
//! pass without tools, then assemble and persist the turn.

mod process;
mod prompt;
mod types;

#[cfg(test)]
mod tests;

pub use prompt::{context_block, personalize_query, system_prompt};
pub use types::{Capability, ChatMessage, OrchestratorConfig, TurnOutcome, TurnRequest};

use minerva_llm::LlmProvider;
use minerva_retrieval::Retriever;
use minerva_store::{HistoryLedger, RecordStore};
use minerva_tools::Dispatcher;
use std::sync::Arc;

/// The per-turn pipeline. All collaborators are injected at construction;
/// unavailable ones are explicit states, not nulls retried later.
pub struct Orchestrator {
    provider: Capability<Arc<dyn LlmProvider>>,
    retriever: Capability<Arc<Retriever>>,
    dispatcher: Arc<Dispatcher>,
    store: RecordStore,
    ledger: HistoryLedger,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create an orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        provider: Capability<Arc<dyn LlmProvider>>,
        retriever: Capability<Arc<Retriever>>,
        dispatcher: Arc<Dispatcher>,
        store: RecordStore,
        ledger: HistoryLedger,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            retriever,
            dispatcher,
            store,
            ledger,
            config,
        }
    }

    /// The configured model identifier, falling back to the provider's
    /// default.
    #[must_use]
    pub fn model_name(&self) -> String {
        if !self.config.model.is_empty() {
            return self.config.model.clone();
        }
        match &self.provider {
            Capability::Ready(provider) => provider.default_model().to_string(),
            Capability::Unavailable(_) => "unconfigured".to_string(),
        }
    }
}
