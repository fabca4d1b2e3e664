//! Orchestrator pipeline tests with scripted collaborators.

use super::types::{Capability, ChatMessage, OrchestratorConfig, TurnRequest};
use super::Orchestrator;
use crate::error::Error;
use minerva_llm::{
    CompletionRequest, CompletionResponse, LlmProvider, ToolCall, ToolCompletionRequest,
    ToolCompletionResponse,
};
use minerva_retrieval::{RawHit, Retriever, VectorIndex};
use minerva_store::{HistoryLedger, RecordStore};
use minerva_tools::{college_catalog, Caller, Dispatcher};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

const MODEL: &str = "test-model";

/// Provider that replays scripted responses in order.
struct ScriptedProvider {
    tool_responses: Mutex<VecDeque<ToolCompletionResponse>>,
    completions: Mutex<VecDeque<CompletionResponse>>,
}

impl ScriptedProvider {
    fn new() -> Self {
        Self {
            tool_responses: Mutex::new(VecDeque::new()),
            completions: Mutex::new(VecDeque::new()),
        }
    }

    fn with_text(self, content: &str) -> Self {
        self.tool_responses.lock().unwrap().push_back(ToolCompletionResponse {
            content: Some(content.to_string()),
            tool_calls: vec![],
            usage: None,
            finish_reason: Some("stop".to_string()),
            model: MODEL.to_string(),
        });
        self
    }

    fn with_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        self.tool_responses.lock().unwrap().push_back(ToolCompletionResponse {
            content: None,
            tool_calls: calls,
            usage: None,
            finish_reason: Some("tool_calls".to_string()),
            model: MODEL.to_string(),
        });
        self
    }

    fn with_followup(self, content: &str) -> Self {
        self.completions.lock().unwrap().push_back(CompletionResponse {
            content: content.to_string(),
            usage: None,
            finish_reason: Some("stop".to_string()),
            model: MODEL.to_string(),
        });
        self
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn default_model(&self) -> &str {
        MODEL
    }

    async fn complete(&self, _request: CompletionRequest) -> minerva_llm::Result<CompletionResponse> {
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| minerva_llm::Error::Api("no scripted completion".into()))
    }

    async fn complete_with_tools(
        &self,
        _request: ToolCompletionRequest,
    ) -> minerva_llm::Result<ToolCompletionResponse> {
        self.tool_responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| minerva_llm::Error::Api("no scripted tool response".into()))
    }
}

/// Provider whose every call fails.
struct FailingProvider;

#[async_trait::async_trait]
impl LlmProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn default_model(&self) -> &str {
        MODEL
    }

    async fn complete(&self, _request: CompletionRequest) -> minerva_llm::Result<CompletionResponse> {
        Err(minerva_llm::Error::Network("connection refused".into()))
    }

    async fn complete_with_tools(
        &self,
        _request: ToolCompletionRequest,
    ) -> minerva_llm::Result<ToolCompletionResponse> {
        Err(minerva_llm::Error::Network("connection refused".into()))
    }
}

/// One-collection index with a single fixed hit.
struct SingleHitIndex;

#[async_trait::async_trait]
impl VectorIndex for SingleHitIndex {
    fn collections(&self) -> Vec<String> {
        vec!["college_courses".to_string()]
    }

    async fn query(
        &self,
        _collection: &str,
        _text: &str,
        _top_k: usize,
        _filter: Option<&serde_json::Value>,
    ) -> minerva_retrieval::Result<Vec<RawHit>> {
        let mut metadata = HashMap::new();
        metadata.insert("source_file".to_string(), "catalog.csv".to_string());
        Ok(vec![RawHit {
            content: "CS101 Intro to Programming, 4 credits.".to_string(),
            distance: 0.3,
            metadata,
        }])
    }
}

async fn seeded_store() -> RecordStore {
    let store = RecordStore::in_memory().await.unwrap();
    store
        .insert_faculty("F001", "Dr. Rao", "Computer Science", "rao@college.edu")
        .await
        .unwrap();
    store
        .insert_course("CS101", "Intro to Programming", "Computer Science", 4, "Fall 2025", "F001")
        .await
        .unwrap();
    store
        .insert_student(
            "STU00001",
            "Asha Verma",
            "asha@college.edu",
            "Computer Science",
            2,
            None,
            None,
        )
        .await
        .unwrap();
    store
        .insert_enrollment("STU00001", "CS101", "Fall 2025", "2025-2026", None)
        .await
        .unwrap();
    store
        .upsert_attendance("STU00001", "CS101", 40, 28, "Fall 2025")
        .await
        .unwrap();
    store
}

async fn orchestrator_with(
    provider: Capability<Arc<dyn LlmProvider>>,
    store: RecordStore,
) -> (Orchestrator, HistoryLedger) {
    let ledger = HistoryLedger::new(store.pool().clone());
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(college_catalog()), store.clone()));
    let retriever = Retriever::new(Arc::new(SingleHitIndex));
    let orchestrator = Orchestrator::new(
        provider,
        Capability::Ready(Arc::new(retriever)),
        dispatcher,
        store,
        ledger.clone(),
        OrchestratorConfig::default(),
    );
    (orchestrator, ledger)
}

fn user_turn(content: &str, caller: Option<Caller>) -> TurnRequest {
    TurnRequest {
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: content.to_string(),
        }],
        caller,
    }
}

#[tokio::test]
async fn test_empty_message_list_rejected() {
    let store = seeded_store().await;
    let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::new().with_text("hi"));
    let (orchestrator, _) = orchestrator_with(Capability::Ready(provider), store).await;

    let result = orchestrator
        .handle_turn(TurnRequest {
            messages: vec![],
            caller: None,
        })
        .await;
    assert!(matches!(result, Err(Error::EmptyConversation)));
}

#[tokio::test]
async fn test_anonymous_grounded_turn_not_persisted() {
    let store = seeded_store().await;
    let provider: Arc<dyn LlmProvider> = Arc::new(
        ScriptedProvider::new().with_text("CS101 is available in Computer Science [catalog]."),
    );
    let (orchestrator, ledger) = orchestrator_with(Capability::Ready(provider), store).await;

    let outcome = orchestrator
        .handle_turn(user_turn(
            "What courses are available in Computer Science?",
            None,
        ))
        .await
        .unwrap();

    assert!(outcome.reply.contains("CS101"));
    assert_eq!(outcome.sources, vec!["catalog.csv".to_string()]);
    assert!(outcome.actions.is_empty());
    assert_eq!(outcome.model, MODEL);

    // No caller id, no persistence
    let stats = ledger.stats(None).await.unwrap();
    assert_eq!(stats.total_conversations, 0);
}

#[tokio::test]
async fn test_tool_turn_end_to_end() {
    let store = seeded_store().await;
    let provider: Arc<dyn LlmProvider> = Arc::new(
        ScriptedProvider::new()
            .with_tool_calls(vec![ToolCall {
                id: "call_1".to_string(),
                name: "check_attendance".to_string(),
                // Model guessed someone else's id; caller injection wins
                arguments: r#"{"student_id": "STU99999", "course_id": "CS101"}"#.to_string(),
            }])
            .with_followup("Your attendance in Intro to Programming is 70%, above no alerts."),
    );
    let (orchestrator, ledger) = orchestrator_with(Capability::Ready(provider), store).await;

    let outcome = orchestrator
        .handle_turn(user_turn(
            "What's my attendance?",
            Some(Caller::student("STU00001")),
        ))
        .await
        .unwrap();

    assert!(outcome.reply.contains("70%"));
    assert_eq!(outcome.actions.len(), 1);
    assert!(outcome.actions[0].starts_with("check_attendance:"));
    assert!(outcome.actions[0].contains("70%"));

    // Persisted with the original query, not the personalized rewrite
    let turns = ledger.history("STU00001", 10, 0).await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].user_query, "What's my attendance?");
    assert!(!turns[0].user_query.contains("student_id:"));
    assert_eq!(turns[0].model.as_deref(), Some(MODEL));
    assert_eq!(turns[0].actions.len(), 1);
}

#[tokio::test]
async fn test_unavailable_provider_degrades_and_persists() {
    let store = seeded_store().await;
    let (orchestrator, ledger) = orchestrator_with(
        Capability::Unavailable("missing OpenAI API key".into()),
        store,
    )
    .await;

    let outcome = orchestrator
        .handle_turn(user_turn(
            "What's my attendance?",
            Some(Caller::student("STU00001")),
        ))
        .await
        .unwrap();

    assert!(outcome.reply.contains("currently unavailable"));
    assert!(outcome.actions.is_empty());
    // Degraded turns are still visible in analytics
    let stats = ledger.stats(Some("STU00001")).await.unwrap();
    assert_eq!(stats.total_conversations, 1);
}

#[tokio::test]
async fn test_provider_error_degrades_turn() {
    let store = seeded_store().await;
    let provider: Arc<dyn LlmProvider> = Arc::new(FailingProvider);
    let (orchestrator, _) = orchestrator_with(Capability::Ready(provider), store).await;

    let outcome = orchestrator
        .handle_turn(user_turn("Anything", None))
        .await
        .unwrap();
    assert!(outcome.reply.contains("could not be reached"));
}

#[tokio::test]
async fn test_malformed_tool_arguments_become_failed_call() {
    let store = seeded_store().await;
    let provider: Arc<dyn LlmProvider> = Arc::new(
        ScriptedProvider::new()
            .with_tool_calls(vec![ToolCall {
                id: "call_1".to_string(),
                name: "check_attendance".to_string(),
                arguments: "{{{ not json".to_string(),
            }])
            .with_followup("I could not check your attendance, sorry."),
    );
    let (orchestrator, _) = orchestrator_with(Capability::Ready(provider), store).await;

    let outcome = orchestrator
        .handle_turn(user_turn(
            "What's my attendance?",
            Some(Caller::student("STU00001")),
        ))
        .await
        .unwrap();

    // The failed call is an action with a diagnostic, and the follow-up
    // still produced the reply
    assert_eq!(outcome.actions.len(), 1);
    assert!(outcome.actions[0].contains("could not be parsed"));
    assert!(outcome.reply.contains("sorry"));
}

#[tokio::test]
async fn test_followup_failure_still_reports_actions() {
    let store = seeded_store().await;
    // Scripted tool call but no scripted follow-up: complete() fails
    let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::new().with_tool_calls(vec![
        ToolCall {
            id: "call_1".to_string(),
            name: "check_fee_status".to_string(),
            arguments: "{}".to_string(),
        },
    ]));
    let (orchestrator, _) = orchestrator_with(Capability::Ready(provider), store).await;

    let outcome = orchestrator
        .handle_turn(user_turn(
            "What are my fees?",
            Some(Caller::student("STU00001")),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.actions.len(), 1);
    assert!(outcome.reply.contains("could not compose a final reply"));
}

#[tokio::test]
async fn test_multiple_tool_calls_execute_in_order() {
    let store = seeded_store().await;
    let provider: Arc<dyn LlmProvider> = Arc::new(
        ScriptedProvider::new()
            .with_tool_calls(vec![
                ToolCall {
                    id: "call_1".to_string(),
                    name: "check_attendance".to_string(),
                    arguments: r#"{"course_id": "CS101"}"#.to_string(),
                },
                ToolCall {
                    id: "call_2".to_string(),
                    name: "check_fee_status".to_string(),
                    arguments: "{}".to_string(),
                },
            ])
            .with_followup("Attendance 70%, no fee records."),
    );
    let (orchestrator, _) = orchestrator_with(Capability::Ready(provider), store).await;

    let outcome = orchestrator
        .handle_turn(user_turn(
            "Attendance and fees please",
            Some(Caller::student("STU00001")),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.actions.len(), 2);
    assert!(outcome.actions[0].starts_with("check_attendance:"));
    assert!(outcome.actions[1].starts_with("check_fee_status:"));
}
