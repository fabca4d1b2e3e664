//! Versioned schema migrations, run once at startup.
//!
//! Request-handling code never issues DDL. Each migration is a numbered
//! batch of idempotent statements; applied versions are tracked in
//! `schema_migrations` so restarts skip completed work.

use crate::error::Result;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// One migration: a version number and its DDL statements.
struct Migration {
    version: i64,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        statements: &[
            "CREATE TABLE IF NOT EXISTS students (
                student_id    TEXT PRIMARY KEY,
                name          TEXT NOT NULL,
                email         TEXT NOT NULL,
                department    TEXT NOT NULL,
                year          INTEGER NOT NULL,
                roll_number   TEXT,
                phone         TEXT,
                password_hash TEXT,
                created_at    TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            "CREATE TABLE IF NOT EXISTS faculty (
                faculty_id      TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                department      TEXT NOT NULL,
                email           TEXT NOT NULL,
                office_location TEXT,
                office_hours    TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            "CREATE TABLE IF NOT EXISTS courses (
                course_id   TEXT PRIMARY KEY,
                course_name TEXT NOT NULL,
                department  TEXT NOT NULL,
                credits     INTEGER NOT NULL,
                semester    TEXT NOT NULL,
                faculty_id  TEXT NOT NULL REFERENCES faculty(faculty_id),
                description TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            "CREATE TABLE IF NOT EXISTS enrollments (
                enrollment_id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id    TEXT NOT NULL REFERENCES students(student_id),
                course_id     TEXT NOT NULL REFERENCES courses(course_id),
                semester      TEXT NOT NULL,
                academic_year TEXT NOT NULL,
                grade         TEXT,
                created_at    TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            "CREATE INDEX IF NOT EXISTS idx_enrollments_student
             ON enrollments(student_id, semester)",
            "CREATE TABLE IF NOT EXISTS attendance (
                attendance_id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id    TEXT NOT NULL REFERENCES students(student_id),
                course_id     TEXT NOT NULL REFERENCES courses(course_id),
                total_classes INTEGER NOT NULL,
                attended      INTEGER NOT NULL,
                percentage    REAL NOT NULL,
                semester      TEXT NOT NULL,
                created_at    TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(student_id, course_id)
            )",
            "CREATE TABLE IF NOT EXISTS fees (
                fee_id      INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id  TEXT NOT NULL REFERENCES students(student_id),
                total_fees  REAL NOT NULL,
                paid_amount REAL NOT NULL,
                due_amount  REAL NOT NULL,
                due_date    TEXT NOT NULL,
                status      TEXT NOT NULL,
                semester    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS exams (
                exam_id     INTEGER PRIMARY KEY AUTOINCREMENT,
                course_id   TEXT NOT NULL REFERENCES courses(course_id),
                exam_date   TEXT NOT NULL,
                exam_time   TEXT NOT NULL,
                room_number TEXT NOT NULL,
                exam_type   TEXT NOT NULL,
                semester    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        ],
    },
    Migration {
        version: 2,
        statements: &[
            // UNIQUE(faculty_id, date, time_slot) is the concurrency guard:
            // two simultaneous bookings for one slot cannot both insert.
            "CREATE TABLE IF NOT EXISTS appointments (
                appointment_id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id     TEXT NOT NULL,
                faculty_id     TEXT NOT NULL,
                date           TEXT NOT NULL,
                time_slot      TEXT NOT NULL,
                status         TEXT NOT NULL DEFAULT 'confirmed',
                created_at     TEXT NOT NULL,
                UNIQUE(faculty_id, date, time_slot)
            )",
            "CREATE TABLE IF NOT EXISTS leave_applications (
                ticket_id  TEXT PRIMARY KEY,
                student_id TEXT NOT NULL,
                from_date  TEXT NOT NULL,
                to_date    TEXT NOT NULL,
                reason     TEXT NOT NULL,
                status     TEXT NOT NULL DEFAULT 'submitted',
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS document_requests (
                ticket_id     TEXT PRIMARY KEY,
                student_id    TEXT NOT NULL,
                document_type TEXT NOT NULL,
                status        TEXT NOT NULL DEFAULT 'submitted',
                eta_days      INTEGER NOT NULL,
                created_at    TEXT NOT NULL
            )",
        ],
    },
    Migration {
        version: 3,
        statements: &[
            "CREATE TABLE IF NOT EXISTS conversation_history (
                conversation_id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id      TEXT,
                user_query      TEXT NOT NULL,
                assistant_reply TEXT NOT NULL,
                sources         TEXT,
                actions         TEXT,
                model           TEXT,
                created_at      TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_history_student
             ON conversation_history(student_id, created_at)",
            // UNIQUE(conversation_id, student_id) backs feedback upsert:
            // one row per (turn, caller), resubmission overwrites.
            "CREATE TABLE IF NOT EXISTS feedback (
                feedback_id     INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL REFERENCES conversation_history(conversation_id),
                student_id      TEXT NOT NULL,
                rating          INTEGER NOT NULL,
                comment         TEXT,
                created_at      TEXT NOT NULL,
                UNIQUE(conversation_id, student_id)
            )",
        ],
    },
];

/// Apply all pending migrations.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    let applied: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
            .fetch_one(pool)
            .await?;
    let applied = applied.unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= applied {
            debug!(version = migration.version, "Migration already applied");
            continue;
        }
        for statement in migration.statements {
            sqlx::query(statement).execute(pool).await?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)")
            .bind(migration.version)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(pool)
            .await?;
        info!(version = migration.version, "Applied schema migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        run(&pool).await.unwrap();
        // Second run is a no-op
        run(&pool).await.unwrap();

        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(version, Some(MIGRATIONS.last().unwrap().version));
    }
}
