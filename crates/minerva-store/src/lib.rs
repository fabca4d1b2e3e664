//! Minerva Store - SQLite persistence for campus records and conversation history
//!
//! This crate provides the two durable components of Minerva:
//! - `RecordStore`: student/course/faculty/attendance/fee/exam records plus
//!   the side-effecting appointment, leave, and document-request tables
//! - `HistoryLedger`: append-only conversation log, feedback, and analytics
//!
//! Schema is created by a versioned migration step at startup (`migrate`),
//! never from request-handling code. Absence is data everywhere: lookups
//! return `Option`/empty vectors, not errors.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod history;
pub mod migrate;
pub mod records;
pub mod types;

pub use error::{Error, Result};
pub use history::HistoryLedger;
pub use records::RecordStore;
pub use types::{
    AttendanceRecord, BookingOutcome, ConversationStats, ConversationTurn, DocumentTicket,
    DocumentType, EnrolledCourse, ExamEntry, FeedbackEntry, FeeRecord, GradeRecord, LeaveTicket,
    NewTurn, QuestionStat, ScheduleEntry, Student, StudentProfile,
};
