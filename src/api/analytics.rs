//! Analytics endpoint: most-asked questions, aggregate stats, recent
//! feedback, plus caller-scoped stats when authenticated.

use super::extract::CurrentStudent;
use super::ApiError;
use crate::server::AppState;
use axum::extract::State;
use axum::Json;
use minerva_store::{ConversationStats, FeedbackEntry, QuestionStat};
use serde::Serialize;

/// Most-asked window in days.
const WINDOW_DAYS: i64 = 30;
/// Most-asked list size.
const MOST_ASKED_LIMIT: i64 = 10;
/// Recent feedback list size.
const RECENT_FEEDBACK_LIMIT: i64 = 5;

/// Analytics response body
#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    /// Most frequently asked questions in the trailing window
    pub most_asked_questions: Vec<QuestionStat>,
    /// Global aggregate stats
    pub global_stats: ConversationStats,
    /// Latest feedback with conversation context
    pub recent_feedback: Vec<FeedbackEntry>,
    /// Caller-scoped stats, when authenticated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_stats: Option<ConversationStats>,
}

/// Aggregate analytics.
pub async fn analytics(
    State(state): State<AppState>,
    CurrentStudent(claims): CurrentStudent,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let most_asked_questions = state
        .ledger
        .most_asked(WINDOW_DAYS, MOST_ASKED_LIMIT)
        .await?;
    let global_stats = state.ledger.stats(None).await?;
    let recent_feedback = state.ledger.recent_feedback(RECENT_FEEDBACK_LIMIT).await?;

    let student_stats = match claims {
        Some(claims) => Some(state.ledger.stats(Some(&claims.sub)).await?),
        None => None,
    };

    Ok(Json(AnalyticsResponse {
        most_asked_questions,
        global_stats,
        recent_feedback,
        student_stats,
    }))
}
