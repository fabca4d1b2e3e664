//! HistoryLedger - append-only conversation log, feedback, and analytics.
//!
//! Turns are immutable once written; ids are assigned by the store and
//! increase monotonically. Feedback is upserted on the (conversation,
//! student) pair, so resubmission overwrites instead of duplicating.

use crate::error::{Error, Result};
use crate::types::{ConversationStats, ConversationTurn, FeedbackEntry, NewTurn, QuestionStat};
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::{debug, instrument};

/// Longest reply prefix kept in the recent-feedback preview.
const REPLY_PREVIEW_CHARS: usize = 200;

/// Append-only conversation ledger. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct HistoryLedger {
    pool: SqlitePool,
}

impl HistoryLedger {
    /// Create a ledger over an already-migrated pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a turn. Returns the server-assigned conversation id.
    #[instrument(skip(self, turn), fields(student = turn.student_id.as_deref().unwrap_or("-")))]
    pub async fn save(&self, turn: &NewTurn) -> Result<i64> {
        let sources = serde_json::to_string(&turn.sources)?;
        let actions = serde_json::to_string(&turn.actions)?;

        let done = sqlx::query(
            "INSERT INTO conversation_history
             (student_id, user_query, assistant_reply, sources, actions, model, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&turn.student_id)
        .bind(&turn.user_query)
        .bind(&turn.assistant_reply)
        .bind(sources)
        .bind(actions)
        .bind(&turn.model)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = done.last_insert_rowid();
        debug!(conversation_id = id, "Conversation turn persisted");
        Ok(id)
    }

    /// Conversation history for a student, newest first.
    pub async fn history(
        &self,
        student_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ConversationTurn>> {
        let rows = sqlx::query(
            "SELECT conversation_id, student_id, user_query, assistant_reply,
                    sources, actions, model, created_at
             FROM conversation_history
             WHERE student_id = ?1
             ORDER BY conversation_id DESC
             LIMIT ?2 OFFSET ?3",
        )
        .bind(student_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_turn).collect()
    }

    /// Most frequently asked questions in the trailing window, grouped by
    /// case-insensitive exact text. Turns without feedback count as
    /// rating 0 in the mean.
    pub async fn most_asked(&self, window_days: i64, limit: i64) -> Result<Vec<QuestionStat>> {
        let cutoff = (Utc::now() - Duration::days(window_days)).to_rfc3339();

        let rows = sqlx::query(
            "SELECT ch.user_query,
                    COUNT(*) AS frequency,
                    AVG(COALESCE(f.rating, 0)) AS avg_rating
             FROM conversation_history ch
             LEFT JOIN feedback f ON ch.conversation_id = f.conversation_id
             WHERE ch.created_at >= ?1
             GROUP BY LOWER(ch.user_query)
             ORDER BY frequency DESC
             LIMIT ?2",
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(QuestionStat {
                    question: row.try_get("user_query")?,
                    frequency: row.try_get("frequency")?,
                    avg_rating: row.try_get("avg_rating")?,
                })
            })
            .collect()
    }

    /// Aggregate statistics, global or scoped to one student.
    pub async fn stats(&self, student_id: Option<&str>) -> Result<ConversationStats> {
        match student_id {
            Some(id) => self.student_stats(id).await,
            None => self.global_stats().await,
        }
    }

    async fn global_stats(&self) -> Result<ConversationStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COUNT(DISTINCT student_id) AS students
             FROM conversation_history",
        )
        .fetch_one(&self.pool)
        .await?;
        let total: i64 = row.try_get("total")?;
        let unique_students: i64 = row.try_get("students")?;

        let positive: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feedback WHERE rating = 1")
            .fetch_one(&self.pool)
            .await?;
        let negative: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feedback WHERE rating = -1")
            .fetch_one(&self.pool)
            .await?;

        Ok(ConversationStats {
            total_conversations: total,
            unique_students: Some(unique_students),
            active_days: None,
            positive_feedback: positive,
            negative_feedback: negative,
            feedback_ratio: Self::ratio(positive, negative),
        })
    }

    async fn student_stats(&self, student_id: &str) -> Result<ConversationStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COUNT(DISTINCT DATE(created_at)) AS days
             FROM conversation_history
             WHERE student_id = ?1",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        let total: i64 = row.try_get("total")?;
        let active_days: i64 = row.try_get("days")?;

        let positive: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)
             FROM feedback f
             JOIN conversation_history ch ON f.conversation_id = ch.conversation_id
             WHERE ch.student_id = ?1 AND f.rating = 1",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        let negative: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)
             FROM feedback f
             JOIN conversation_history ch ON f.conversation_id = ch.conversation_id
             WHERE ch.student_id = ?1 AND f.rating = -1",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ConversationStats {
            total_conversations: total,
            unique_students: None,
            active_days: Some(active_days),
            positive_feedback: positive,
            negative_feedback: negative,
            feedback_ratio: Self::ratio(positive, negative),
        })
    }

    /// Record feedback for a turn. Ratings are restricted to +1/-1; a
    /// second submission for the same (turn, student) pair overwrites
    /// rating, comment, and timestamp.
    #[instrument(skip(self, comment))]
    pub async fn save_feedback(
        &self,
        conversation_id: i64,
        student_id: &str,
        rating: i64,
        comment: Option<&str>,
    ) -> Result<i64> {
        if rating != 1 && rating != -1 {
            return Err(Error::InvalidInput(
                "rating must be 1 (thumbs up) or -1 (thumbs down)".into(),
            ));
        }

        sqlx::query(
            "INSERT INTO feedback (conversation_id, student_id, rating, comment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(conversation_id, student_id) DO UPDATE SET
                 rating = excluded.rating,
                 comment = excluded.comment,
                 created_at = excluded.created_at",
        )
        .bind(conversation_id)
        .bind(student_id)
        .bind(rating)
        .bind(comment)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id: i64 = sqlx::query_scalar(
            "SELECT feedback_id FROM feedback
             WHERE conversation_id = ?1 AND student_id = ?2",
        )
        .bind(conversation_id)
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Recent feedback joined with conversation context, newest first.
    pub async fn recent_feedback(&self, limit: i64) -> Result<Vec<FeedbackEntry>> {
        let rows = sqlx::query(
            "SELECT f.feedback_id, f.conversation_id, f.student_id, f.rating,
                    f.comment, f.created_at, ch.user_query, ch.assistant_reply
             FROM feedback f
             JOIN conversation_history ch ON f.conversation_id = ch.conversation_id
             ORDER BY f.created_at DESC
             LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let reply: String = row.try_get("assistant_reply")?;
                Ok(FeedbackEntry {
                    feedback_id: row.try_get("feedback_id")?,
                    conversation_id: row.try_get("conversation_id")?,
                    student_id: row.try_get("student_id")?,
                    rating: row.try_get("rating")?,
                    comment: row.try_get("comment")?,
                    created_at: Self::parse_timestamp(row.try_get("created_at")?)?,
                    user_query: row.try_get("user_query")?,
                    reply_preview: Self::preview(&reply),
                })
            })
            .collect()
    }

    fn preview(reply: &str) -> String {
        if reply.chars().count() > REPLY_PREVIEW_CHARS {
            let truncated: String = reply.chars().take(REPLY_PREVIEW_CHARS).collect();
            format!("{truncated}...")
        } else {
            reply.to_string()
        }
    }

    fn ratio(positive: i64, negative: i64) -> f64 {
        let total = positive + negative;
        if total == 0 {
            0.0
        } else {
            positive as f64 / total as f64
        }
    }

    fn parse_timestamp(raw: String) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::Internal(format!("bad timestamp {raw:?}: {e}")))
    }

    fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> Result<ConversationTurn> {
        let sources: Option<String> = row.try_get("sources")?;
        let actions: Option<String> = row.try_get("actions")?;
        Ok(ConversationTurn {
            conversation_id: row.try_get("conversation_id")?,
            student_id: row.try_get("student_id")?,
            user_query: row.try_get("user_query")?,
            assistant_reply: row.try_get("assistant_reply")?,
            sources: match sources {
                Some(raw) => serde_json::from_str(&raw)?,
                None => Vec::new(),
            },
            actions: match actions {
                Some(raw) => serde_json::from_str(&raw)?,
                None => Vec::new(),
            },
            model: row.try_get("model")?,
            created_at: Self::parse_timestamp(row.try_get("created_at")?)?,
        })
    }
}
