//! Record and ledger types.
//!
//! Everything here crosses a boundary: tool results, HTTP responses, or
//! persisted rows. Shapes are serde-friendly and carry no SQL details.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attendance percentage below this threshold raises an alert.
/// The bound is strict: exactly 75.0 is not flagged.
pub const ATTENDANCE_ALERT_THRESHOLD: f64 = 75.0;

/// A student record (never includes the password hash).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    /// Unique student identifier (e.g. `STU00001`)
    pub student_id: String,
    /// Full name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Department name
    pub department: String,
    /// Year of study
    pub year: i64,
    /// Phone number, if on file
    pub phone: Option<String>,
}

/// A course the student is enrolled in, with the recorded grade if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledCourse {
    /// Course code (e.g. `CS101`)
    pub course_id: String,
    /// Course title
    pub course_name: String,
    /// Credit hours
    pub credits: i64,
    /// Semester of enrollment
    pub semester: String,
    /// Grade, or "In Progress" when not yet recorded
    pub grade: String,
}

/// Attendance summary for one student/course pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Course code
    pub course_id: String,
    /// Course title
    pub course_name: String,
    /// Classes held so far
    pub total_classes: i64,
    /// Classes attended
    pub attended: i64,
    /// Derived percentage, recomputed from attended/total on write
    pub percentage: f64,
    /// True when percentage is strictly below the alert threshold
    pub alert: bool,
}

impl AttendanceRecord {
    /// Whether a percentage is below the alert threshold (strict bound).
    #[must_use]
    pub fn is_below_threshold(percentage: f64) -> bool {
        percentage < ATTENDANCE_ALERT_THRESHOLD
    }
}

/// Full profile returned after login and by the profile endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    /// The student record
    #[serde(flatten)]
    pub student: Student,
    /// All enrollments, newest semester first
    pub enrolled_courses: Vec<EnrolledCourse>,
    /// Attendance across enrolled courses
    pub attendance_summary: Vec<AttendanceRecord>,
}

/// One class on a student's schedule for a given date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Course code
    pub course_id: String,
    /// Course title
    pub course_name: String,
    /// Department offering the course
    pub department: String,
    /// Semester
    pub semester: String,
    /// Date the schedule was requested for (YYYY-MM-DD)
    pub date: String,
    /// Instructor of record
    pub faculty_name: String,
}

/// Latest fee record for a student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeRecord {
    /// Total fees for the semester
    pub total_fees: f64,
    /// Amount paid so far
    pub paid_amount: f64,
    /// Outstanding amount
    pub due_amount: f64,
    /// Payment deadline (YYYY-MM-DD)
    pub due_date: String,
    /// Status label (e.g. `paid`, `partial`, `overdue`)
    pub status: String,
    /// Semester the record covers
    pub semester: String,
}

/// Grade for one student/course/semester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRecord {
    /// Course code
    pub course_id: String,
    /// Course title
    pub course_name: String,
    /// Semester
    pub semester: String,
    /// Letter grade, if recorded
    pub grade: Option<String>,
    /// Credit hours
    pub credits: i64,
}

/// One exam on the schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamEntry {
    /// Course code
    pub course_id: String,
    /// Course title
    pub course_name: String,
    /// Exam date (YYYY-MM-DD)
    pub exam_date: String,
    /// Exam start time
    pub exam_time: String,
    /// Room number
    pub room: String,
    /// Exam type (e.g. `midterm`, `final`)
    pub exam_type: String,
}

/// Result of an appointment booking attempt.
///
/// A taken slot is an outcome, not an error: callers surface it to the
/// model with alternative slots so the conversation can recover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    /// Slot was free; a durable appointment row now exists
    Booked {
        /// Server-assigned appointment id
        appointment_id: i64,
    },
    /// The (faculty, date, slot) triple is already occupied
    SlotTaken,
}

/// A leave application ticket.
///
/// The ticket id is derived from (student, from, to), so resubmitting the
/// same range overwrites the earlier application instead of duplicating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveTicket {
    /// Deterministic ticket id (`LV-<student>-<from>-<to>`)
    pub ticket_id: String,
    /// Applicant
    pub student_id: String,
    /// First day of leave (YYYY-MM-DD)
    pub from_date: String,
    /// Last day of leave (YYYY-MM-DD)
    pub to_date: String,
    /// Stated reason
    pub reason: String,
    /// Application status
    pub status: String,
}

impl LeaveTicket {
    /// Derive the deterministic ticket id for a (student, from, to) triple.
    #[must_use]
    pub fn derive_id(student_id: &str, from_date: &str, to_date: &str) -> String {
        format!(
            "LV-{}-{}-{}",
            student_id,
            from_date.replace('-', ""),
            to_date.replace('-', "")
        )
    }
}

/// Official document kinds that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    /// Bonafide certificate
    Bonafide,
    /// Student ID card
    IdCard,
    /// Academic transcript
    Transcript,
    /// No-objection certificate
    Noc,
}

impl DocumentType {
    /// Parse a user-facing label. Returns `None` for unsupported types.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "bonafide" => Some(Self::Bonafide),
            "id card" | "idcard" | "id_card" => Some(Self::IdCard),
            "transcript" => Some(Self::Transcript),
            "noc" => Some(Self::Noc),
            _ => None,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bonafide => "Bonafide",
            Self::IdCard => "ID Card",
            Self::Transcript => "Transcript",
            Self::Noc => "NOC",
        }
    }

    /// Estimated processing time in days.
    #[must_use]
    pub fn eta_days(&self) -> i64 {
        match self {
            Self::Bonafide | Self::IdCard => 2,
            Self::Transcript | Self::Noc => 5,
        }
    }

    /// All supported labels, for rejection messages.
    #[must_use]
    pub fn supported() -> &'static [&'static str] {
        &["Bonafide", "ID Card", "NOC", "Transcript"]
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A document request ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTicket {
    /// Deterministic ticket id (`DOC-<student>-<TYPE>`)
    pub ticket_id: String,
    /// Requester
    pub student_id: String,
    /// Requested document kind
    pub document_type: DocumentType,
    /// Estimated processing time in days
    pub eta_days: i64,
    /// Request status
    pub status: String,
}

impl DocumentTicket {
    /// Derive the deterministic ticket id for a (student, type) pair.
    #[must_use]
    pub fn derive_id(student_id: &str, document_type: DocumentType) -> String {
        format!(
            "DOC-{}-{}",
            student_id,
            document_type.as_str().replace(' ', "").to_uppercase()
        )
    }
}

/// A turn to be appended to the conversation ledger.
#[derive(Debug, Clone)]
pub struct NewTurn {
    /// Caller id; `None` for anonymous turns
    pub student_id: Option<String>,
    /// The query exactly as the caller sent it
    pub user_query: String,
    /// Final assistant reply
    pub assistant_reply: String,
    /// Deduplicated source labels, first-seen order
    pub sources: Vec<String>,
    /// Human-readable action summaries, execution order
    pub actions: Vec<String>,
    /// Model identifier used for the turn
    pub model: Option<String>,
}

/// A persisted conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Server-assigned id, monotonically increasing
    pub conversation_id: i64,
    /// Caller id; `None` for anonymous turns
    pub student_id: Option<String>,
    /// The query exactly as the caller sent it
    pub user_query: String,
    /// Final assistant reply
    pub assistant_reply: String,
    /// Deduplicated source labels
    pub sources: Vec<String>,
    /// Action summaries
    pub actions: Vec<String>,
    /// Model identifier
    pub model: Option<String>,
    /// When the turn was recorded
    pub created_at: DateTime<Utc>,
}

/// Aggregated question frequency within a trailing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionStat {
    /// Representative query text
    pub question: String,
    /// How many times it was asked (case-insensitive exact match)
    pub frequency: i64,
    /// Mean rating, turns without feedback counted as 0
    pub avg_rating: f64,
}

/// Conversation statistics, global or scoped to one student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationStats {
    /// Total persisted turns
    pub total_conversations: i64,
    /// Distinct students (global scope only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_students: Option<i64>,
    /// Distinct active days (student scope only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_days: Option<i64>,
    /// Thumbs-up count
    pub positive_feedback: i64,
    /// Thumbs-down count
    pub negative_feedback: i64,
    /// positive / (positive + negative); 0.0 with no feedback
    pub feedback_ratio: f64,
}

/// A feedback row joined with its conversation, for the analytics feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    /// Feedback row id
    pub feedback_id: i64,
    /// Conversation the feedback refers to
    pub conversation_id: i64,
    /// Student who left the feedback
    pub student_id: String,
    /// +1 or -1
    pub rating: i64,
    /// Optional free-text comment
    pub comment: Option<String>,
    /// When the feedback was (last) submitted
    pub created_at: DateTime<Utc>,
    /// The conversation's query
    pub user_query: String,
    /// Truncated reply preview
    pub reply_preview: String,
}
