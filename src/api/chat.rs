//! Chat, history, and feedback endpoints.

use super::extract::{CurrentStudent, RequireStudent};
use super::ApiError;
use crate::server::AppState;
use axum::extract::{Query, State};
use axum::Json;
use minerva_core::{ChatMessage, TurnRequest};
use minerva_store::ConversationTurn;
use minerva_tools::Caller;
use serde::{Deserialize, Serialize};

/// Chat request body
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Full conversation history; the last entry is the current query
    pub messages: Vec<ChatMessage>,
}

/// Chat response body
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Final reply text
    pub reply: String,
    /// Deduplicated cited source labels
    pub sources: Vec<String>,
    /// Human-readable action summaries
    pub actions: Vec<String>,
    /// Model identifier used
    pub model: String,
}

/// One chat turn. Authentication is optional; authenticated callers get
/// personalization and persistence.
pub async fn chat(
    State(state): State<AppState>,
    CurrentStudent(claims): CurrentStudent,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let caller = claims.map(|claims| Caller {
        student_id: claims.sub,
        role: claims.role,
    });

    let outcome = state
        .orchestrator
        .handle_turn(TurnRequest {
            messages: payload.messages,
            caller,
        })
        .await?;

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        sources: outcome.sources,
        actions: outcome.actions,
        model: outcome.model,
    }))
}

/// History query parameters
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Page size (default 20)
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Page offset
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

/// History response body
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Caller id
    pub student_id: String,
    /// Number of turns returned
    pub count: usize,
    /// Turns, newest first
    pub conversations: Vec<ConversationTurn>,
}

/// Conversation history for the authenticated caller.
pub async fn history(
    State(state): State<AppState>,
    RequireStudent(claims): RequireStudent,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let conversations = state
        .ledger
        .history(&claims.sub, params.limit, params.offset)
        .await?;

    Ok(Json(HistoryResponse {
        student_id: claims.sub,
        count: conversations.len(),
        conversations,
    }))
}

/// Feedback request body
#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    /// The turn the feedback refers to
    pub conversation_id: i64,
    /// 1 for thumbs up, -1 for thumbs down
    pub rating: i64,
    /// Optional comment
    pub comment: Option<String>,
}

/// Feedback response body
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    /// Whether the feedback was recorded
    pub success: bool,
    /// Feedback row id (stable across resubmissions)
    pub feedback_id: i64,
    /// Human-readable outcome
    pub message: String,
}

/// Record feedback for a turn. Resubmission overwrites.
pub async fn feedback(
    State(state): State<AppState>,
    RequireStudent(claims): RequireStudent,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    if payload.rating != 1 && payload.rating != -1 {
        return Err(ApiError::bad_request(
            "Rating must be 1 (thumbs up) or -1 (thumbs down)",
        ));
    }

    let feedback_id = state
        .ledger
        .save_feedback(
            payload.conversation_id,
            &claims.sub,
            payload.rating,
            payload.comment.as_deref(),
        )
        .await?;

    let rating_text = if payload.rating == 1 { "positive" } else { "negative" };
    Ok(Json(FeedbackResponse {
        success: true,
        feedback_id,
        message: format!("Thank you for your {rating_text} feedback!"),
    }))
}
