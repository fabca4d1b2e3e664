//! RecordStore - query contracts over the campus database.
//!
//! Every lookup returns `Option`/`Vec`; "not found" is never an error.
//! Side-effecting operations (`book_appointment`, `apply_leave`,
//! `request_document`) each run as their own transaction boundary and
//! report conflicts as structured outcomes.

use crate::error::{Error, Result};
use crate::migrate;
use crate::types::{
    AttendanceRecord, BookingOutcome, DocumentTicket, DocumentType, EnrolledCourse, ExamEntry,
    FeeRecord, GradeRecord, LeaveTicket, ScheduleEntry, Student, StudentProfile,
};
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::{debug, info, instrument};

/// SQLite-backed record store. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    /// Open (or create) the store at the given path and apply migrations.
    pub async fn from_path(db_path: &std::path::Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Internal(format!("mkdir: {e}")))?;
        }
        let url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        // WAL gives concurrent readers while a writer is active
        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;

        migrate::run(&pool).await?;
        info!("Record store initialized at {}", db_path.display());
        Ok(Self { pool })
    }

    /// In-memory store (for tests).
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        migrate::run(&pool).await?;
        debug!("In-memory record store initialized");
        Ok(Self { pool })
    }

    /// The underlying pool, shared with the history ledger.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ── Students ────────────────────────────────────────────────

    /// Whether a student id exists.
    pub async fn student_exists(&self, student_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM students WHERE student_id = ?1 LIMIT 1")
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Fetch a student record (without the password hash).
    pub async fn get_student(&self, student_id: &str) -> Result<Option<Student>> {
        let row = sqlx::query(
            "SELECT student_id, name, email, department, year, phone
             FROM students WHERE student_id = ?1 LIMIT 1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_student).transpose()
    }

    /// Fetch a student with the stored password hash, for authentication.
    pub async fn get_credentials(&self, student_id: &str) -> Result<Option<(Student, Option<String>)>> {
        let row = sqlx::query(
            "SELECT student_id, name, email, department, year, phone, password_hash
             FROM students WHERE student_id = ?1 LIMIT 1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let student = Self::row_to_student(&row)?;
                let hash: Option<String> = row.try_get("password_hash")?;
                Ok(Some((student, hash)))
            }
            None => Ok(None),
        }
    }

    /// Full profile: student + enrollments + attendance summary.
    #[instrument(skip(self))]
    pub async fn get_student_profile(&self, student_id: &str) -> Result<Option<StudentProfile>> {
        let Some(student) = self.get_student(student_id).await? else {
            return Ok(None);
        };

        let rows = sqlx::query(
            "SELECT e.course_id, c.course_name, c.credits, e.semester, e.grade
             FROM enrollments e
             JOIN courses c ON e.course_id = c.course_id
             WHERE e.student_id = ?1
             ORDER BY e.semester DESC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let mut enrolled_courses = Vec::with_capacity(rows.len());
        for row in &rows {
            let grade: Option<String> = row.try_get("grade")?;
            enrolled_courses.push(EnrolledCourse {
                course_id: row.try_get("course_id")?,
                course_name: row.try_get("course_name")?,
                credits: row.try_get("credits")?,
                semester: row.try_get("semester")?,
                grade: grade.unwrap_or_else(|| "In Progress".into()),
            });
        }

        let attendance_summary = self.list_attendance(student_id).await?;

        Ok(Some(StudentProfile {
            student,
            enrolled_courses,
            attendance_summary,
        }))
    }

    // ── Attendance ──────────────────────────────────────────────

    /// Attendance for one course.
    pub async fn get_attendance(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Option<AttendanceRecord>> {
        let row = sqlx::query(
            "SELECT a.course_id, c.course_name, a.total_classes, a.attended, a.percentage
             FROM attendance a
             JOIN courses c ON a.course_id = c.course_id
             WHERE a.student_id = ?1 AND a.course_id = ?2",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_attendance).transpose()
    }

    /// All attendance records for a student, worst percentage first.
    pub async fn list_attendance(&self, student_id: &str) -> Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query(
            "SELECT a.course_id, c.course_name, a.total_classes, a.attended, a.percentage
             FROM attendance a
             JOIN courses c ON a.course_id = c.course_id
             WHERE a.student_id = ?1
             ORDER BY a.percentage ASC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_attendance).collect()
    }

    /// Insert or update an attendance record.
    ///
    /// `percentage` is derived here from attended/total; it is never
    /// accepted from the caller, so the cached column cannot drift.
    pub async fn upsert_attendance(
        &self,
        student_id: &str,
        course_id: &str,
        total_classes: i64,
        attended: i64,
        semester: &str,
    ) -> Result<()> {
        if total_classes <= 0 || attended < 0 || attended > total_classes {
            return Err(Error::InvalidInput(format!(
                "attendance counts out of range: {attended}/{total_classes}"
            )));
        }
        let percentage = attended as f64 / total_classes as f64 * 100.0;

        sqlx::query(
            "INSERT INTO attendance (student_id, course_id, total_classes, attended, percentage, semester)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(student_id, course_id) DO UPDATE SET
                 total_classes = excluded.total_classes,
                 attended = excluded.attended,
                 percentage = excluded.percentage,
                 semester = excluded.semester",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(total_classes)
        .bind(attended)
        .bind(percentage)
        .bind(semester)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ── Schedule / fees / grades / exams ────────────────────────

    /// Classes for a student on the given date (defaults to today).
    pub async fn get_schedule(
        &self,
        student_id: &str,
        date: Option<&str>,
    ) -> Result<Vec<ScheduleEntry>> {
        let rows = sqlx::query(
            "SELECT e.course_id, c.course_name, c.department, c.semester, f.name AS faculty_name
             FROM enrollments e
             JOIN courses c ON e.course_id = c.course_id
             JOIN faculty f ON c.faculty_id = f.faculty_id
             WHERE e.student_id = ?1
             ORDER BY e.course_id",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let date = date
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().date_naive().to_string());

        rows.iter()
            .map(|row| {
                Ok(ScheduleEntry {
                    course_id: row.try_get("course_id")?,
                    course_name: row.try_get("course_name")?,
                    department: row.try_get("department")?,
                    semester: row.try_get("semester")?,
                    date: date.clone(),
                    faculty_name: row.try_get("faculty_name")?,
                })
            })
            .collect()
    }

    /// Latest fee record for a student.
    pub async fn get_fee_status(&self, student_id: &str) -> Result<Option<FeeRecord>> {
        let row = sqlx::query(
            "SELECT total_fees, paid_amount, due_amount, due_date, status, semester
             FROM fees
             WHERE student_id = ?1
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(FeeRecord {
                total_fees: row.try_get("total_fees")?,
                paid_amount: row.try_get("paid_amount")?,
                due_amount: row.try_get("due_amount")?,
                due_date: row.try_get("due_date")?,
                status: row.try_get("status")?,
                semester: row.try_get("semester")?,
            })),
            None => Ok(None),
        }
    }

    /// Grade for one student/course/semester.
    pub async fn get_grade(
        &self,
        student_id: &str,
        course_id: &str,
        semester: &str,
    ) -> Result<Option<GradeRecord>> {
        let row = sqlx::query(
            "SELECT e.course_id, c.course_name, e.semester, e.grade, c.credits
             FROM enrollments e
             JOIN courses c ON e.course_id = c.course_id
             WHERE e.student_id = ?1 AND e.course_id = ?2 AND e.semester = ?3",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(semester)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(GradeRecord {
                course_id: row.try_get("course_id")?,
                course_name: row.try_get("course_name")?,
                semester: row.try_get("semester")?,
                grade: row.try_get("grade")?,
                credits: row.try_get("credits")?,
            })),
            None => Ok(None),
        }
    }

    /// Exams for the student's enrolled courses in a semester,
    /// ordered by date then time.
    pub async fn get_exam_schedule(
        &self,
        student_id: &str,
        semester: &str,
    ) -> Result<Vec<ExamEntry>> {
        let rows = sqlx::query(
            "SELECT ex.course_id, c.course_name, ex.exam_date, ex.exam_time,
                    ex.room_number, ex.exam_type
             FROM exams ex
             JOIN courses c ON ex.course_id = c.course_id
             JOIN enrollments e ON e.course_id = ex.course_id AND e.semester = ex.semester
             WHERE e.student_id = ?1 AND ex.semester = ?2
             ORDER BY ex.exam_date, ex.exam_time",
        )
        .bind(student_id)
        .bind(semester)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ExamEntry {
                    course_id: row.try_get("course_id")?,
                    course_name: row.try_get("course_name")?,
                    exam_date: row.try_get("exam_date")?,
                    exam_time: row.try_get("exam_time")?,
                    room: row.try_get("room_number")?,
                    exam_type: row.try_get("exam_type")?,
                })
            })
            .collect()
    }

    /// Faculty name lookup.
    pub async fn faculty_name(&self, faculty_id: &str) -> Result<Option<String>> {
        let name = sqlx::query_scalar("SELECT name FROM faculty WHERE faculty_id = ?1")
            .bind(faculty_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }

    // ── Appointments ────────────────────────────────────────────

    /// Book an appointment slot.
    ///
    /// A single INSERT relies on the UNIQUE(faculty, date, slot)
    /// constraint, so under concurrent attempts exactly one booking
    /// succeeds and the loser sees `SlotTaken`.
    #[instrument(skip(self))]
    pub async fn book_appointment(
        &self,
        student_id: &str,
        faculty_id: &str,
        date: &str,
        time_slot: &str,
    ) -> Result<BookingOutcome> {
        let result = sqlx::query(
            "INSERT INTO appointments (student_id, faculty_id, date, time_slot, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(student_id)
        .bind(faculty_id)
        .bind(date)
        .bind(time_slot)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(BookingOutcome::Booked {
                appointment_id: done.last_insert_rowid(),
            }),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                debug!(faculty_id, date, time_slot, "Appointment slot already taken");
                Ok(BookingOutcome::SlotTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Slots already booked for a faculty member on a date.
    pub async fn booked_slots(&self, faculty_id: &str, date: &str) -> Result<Vec<String>> {
        let slots = sqlx::query_scalar(
            "SELECT time_slot FROM appointments WHERE faculty_id = ?1 AND date = ?2",
        )
        .bind(faculty_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(slots)
    }

    // ── Leave / documents ───────────────────────────────────────

    /// File a leave application. Identical (student, from, to) parameters
    /// collapse to one ticket; resubmission overwrites the earlier row.
    #[instrument(skip(self, reason))]
    pub async fn apply_leave(
        &self,
        student_id: &str,
        from_date: &str,
        to_date: &str,
        reason: &str,
    ) -> Result<LeaveTicket> {
        let ticket_id = LeaveTicket::derive_id(student_id, from_date, to_date);

        sqlx::query(
            "INSERT OR REPLACE INTO leave_applications
             (ticket_id, student_id, from_date, to_date, reason, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'submitted', ?6)",
        )
        .bind(&ticket_id)
        .bind(student_id)
        .bind(from_date)
        .bind(to_date)
        .bind(reason)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(LeaveTicket {
            ticket_id,
            student_id: student_id.to_string(),
            from_date: from_date.to_string(),
            to_date: to_date.to_string(),
            reason: reason.to_string(),
            status: "submitted".to_string(),
        })
    }

    /// File a document request. One ticket per (student, type); repeats
    /// overwrite.
    #[instrument(skip(self))]
    pub async fn request_document(
        &self,
        student_id: &str,
        document_type: DocumentType,
    ) -> Result<DocumentTicket> {
        let ticket_id = DocumentTicket::derive_id(student_id, document_type);
        let eta_days = document_type.eta_days();

        sqlx::query(
            "INSERT OR REPLACE INTO document_requests
             (ticket_id, student_id, document_type, status, eta_days, created_at)
             VALUES (?1, ?2, ?3, 'submitted', ?4, ?5)",
        )
        .bind(&ticket_id)
        .bind(student_id)
        .bind(document_type.as_str())
        .bind(eta_days)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(DocumentTicket {
            ticket_id,
            student_id: student_id.to_string(),
            document_type,
            eta_days,
            status: "submitted".to_string(),
        })
    }

    // ── Seeding (admin/test data) ───────────────────────────────

    /// Insert a student row.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_student(
        &self,
        student_id: &str,
        name: &str,
        email: &str,
        department: &str,
        year: i64,
        phone: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO students (student_id, name, email, department, year, phone, password_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(student_id)
        .bind(name)
        .bind(email)
        .bind(department)
        .bind(year)
        .bind(phone)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a faculty row.
    pub async fn insert_faculty(
        &self,
        faculty_id: &str,
        name: &str,
        department: &str,
        email: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO faculty (faculty_id, name, department, email)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(faculty_id)
        .bind(name)
        .bind(department)
        .bind(email)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a course row.
    pub async fn insert_course(
        &self,
        course_id: &str,
        course_name: &str,
        department: &str,
        credits: i64,
        semester: &str,
        faculty_id: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO courses (course_id, course_name, department, credits, semester, faculty_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(course_id)
        .bind(course_name)
        .bind(department)
        .bind(credits)
        .bind(semester)
        .bind(faculty_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert an enrollment row.
    pub async fn insert_enrollment(
        &self,
        student_id: &str,
        course_id: &str,
        semester: &str,
        academic_year: &str,
        grade: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO enrollments (student_id, course_id, semester, academic_year, grade)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(semester)
        .bind(academic_year)
        .bind(grade)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a fee row.
    pub async fn insert_fee(
        &self,
        student_id: &str,
        total_fees: f64,
        paid_amount: f64,
        due_date: &str,
        status: &str,
        semester: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO fees (student_id, total_fees, paid_amount, due_amount, due_date, status, semester, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(student_id)
        .bind(total_fees)
        .bind(paid_amount)
        .bind(total_fees - paid_amount)
        .bind(due_date)
        .bind(status)
        .bind(semester)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert an exam row.
    pub async fn insert_exam(
        &self,
        course_id: &str,
        exam_date: &str,
        exam_time: &str,
        room_number: &str,
        exam_type: &str,
        semester: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO exams (course_id, exam_date, exam_time, room_number, exam_type, semester)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(course_id)
        .bind(exam_date)
        .bind(exam_time)
        .bind(room_number)
        .bind(exam_type)
        .bind(semester)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ── Row mapping ─────────────────────────────────────────────

    fn row_to_student(row: &sqlx::sqlite::SqliteRow) -> Result<Student> {
        Ok(Student {
            student_id: row.try_get("student_id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            department: row.try_get("department")?,
            year: row.try_get("year")?,
            phone: row.try_get("phone")?,
        })
    }

    fn row_to_attendance(row: &sqlx::sqlite::SqliteRow) -> Result<AttendanceRecord> {
        let percentage: f64 = row.try_get("percentage")?;
        Ok(AttendanceRecord {
            course_id: row.try_get("course_id")?,
            course_name: row.try_get("course_name")?,
            total_classes: row.try_get("total_classes")?,
            attended: row.try_get("attended")?,
            percentage,
            alert: AttendanceRecord::is_below_threshold(percentage),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
            .insert_course("CS102", "Data Structures", "Computer Science", 4, "Fall 2025", "F001")
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
            .insert_enrollment("STU00001", "CS101", "Fall 2025", "2025-2026", Some("A"))
            .await
            .unwrap();
        store
            .insert_enrollment("STU00001", "CS102", "Fall 2025", "2025-2026", None)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_student_lookup() {
        let store = seeded_store().await;
        assert!(store.student_exists("STU00001").await.unwrap());
        assert!(!store.student_exists("STU99999").await.unwrap());

        let student = store.get_student("STU00001").await.unwrap().unwrap();
        assert_eq!(student.name, "Asha Verma");
        assert!(store.get_student("STU99999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_attendance_percentage_derived_on_write() {
        let store = seeded_store().await;
        store
            .upsert_attendance("STU00001", "CS101", 40, 30, "Fall 2025")
            .await
            .unwrap();

        let record = store
            .get_attendance("STU00001", "CS101")
            .await
            .unwrap()
            .unwrap();
        assert!((record.percentage - 75.0).abs() < f64::EPSILON);
        // Exactly 75.0 does not raise the alert
        assert!(!record.alert);

        // Rewriting with fewer attended classes recomputes the cache
        store
            .upsert_attendance("STU00001", "CS101", 40, 20, "Fall 2025")
            .await
            .unwrap();
        let record = store
            .get_attendance("STU00001", "CS101")
            .await
            .unwrap()
            .unwrap();
        assert!((record.percentage - 50.0).abs() < f64::EPSILON);
        assert!(record.alert);
    }

    #[tokio::test]
    async fn test_attendance_rejects_bad_counts() {
        let store = seeded_store().await;
        let err = store
            .upsert_attendance("STU00001", "CS101", 10, 11, "Fall 2025")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_profile_includes_enrollments_and_attendance() {
        let store = seeded_store().await;
        store
            .upsert_attendance("STU00001", "CS102", 40, 24, "Fall 2025")
            .await
            .unwrap();

        let profile = store
            .get_student_profile("STU00001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.enrolled_courses.len(), 2);
        assert_eq!(profile.attendance_summary.len(), 1);
        assert!(profile.attendance_summary[0].alert);
        // Missing grade is rendered as "In Progress"
        assert!(profile
            .enrolled_courses
            .iter()
            .any(|c| c.grade == "In Progress"));
    }

    #[tokio::test]
    async fn test_fee_status_returns_latest() {
        let store = seeded_store().await;
        assert!(store.get_fee_status("STU00001").await.unwrap().is_none());

        store
            .insert_fee("STU00001", 50000.0, 20000.0, "2025-10-01", "partial", "Fall 2025")
            .await
            .unwrap();
        store
            .insert_fee("STU00001", 50000.0, 50000.0, "2026-02-01", "paid", "Spring 2026")
            .await
            .unwrap();

        let fee = store.get_fee_status("STU00001").await.unwrap().unwrap();
        assert_eq!(fee.semester, "Spring 2026");
        assert_eq!(fee.status, "paid");
    }

    #[tokio::test]
    async fn test_grade_lookup() {
        let store = seeded_store().await;
        let grade = store
            .get_grade("STU00001", "CS101", "Fall 2025")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grade.grade.as_deref(), Some("A"));
        assert!(store
            .get_grade("STU00001", "CS101", "Spring 2026")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_exam_schedule_ordering() {
        let store = seeded_store().await;
        store
            .insert_exam("CS102", "2025-12-12", "09:00", "R2", "final", "Fall 2025")
            .await
            .unwrap();
        store
            .insert_exam("CS101", "2025-12-10", "14:00", "R1", "final", "Fall 2025")
            .await
            .unwrap();

        let exams = store
            .get_exam_schedule("STU00001", "Fall 2025")
            .await
            .unwrap();
        assert_eq!(exams.len(), 2);
        assert_eq!(exams[0].course_id, "CS101");
        assert!(store
            .get_exam_schedule("STU00001", "Summer 2027")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_booking_conflict_is_an_outcome() {
        let store = seeded_store().await;

        let first = store
            .book_appointment("STU00001", "F001", "2026-01-05", "10:00-10:30")
            .await
            .unwrap();
        assert!(matches!(first, BookingOutcome::Booked { .. }));

        let second = store
            .book_appointment("STU00001", "F001", "2026-01-05", "10:00-10:30")
            .await
            .unwrap();
        assert_eq!(second, BookingOutcome::SlotTaken);

        // Exactly one row exists for the triple
        let booked = store.booked_slots("F001", "2026-01-05").await.unwrap();
        assert_eq!(booked, vec!["10:00-10:30".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_booking_single_winner() {
        let store = seeded_store().await;

        let (a, b) = tokio::join!(
            store.book_appointment("STU00001", "F001", "2026-01-06", "09:00-09:30"),
            store.book_appointment("STU00002", "F001", "2026-01-06", "09:00-09:30"),
        );
        let outcomes = [a.unwrap(), b.unwrap()];

        let booked = outcomes
            .iter()
            .filter(|o| matches!(o, BookingOutcome::Booked { .. }))
            .count();
        let taken = outcomes
            .iter()
            .filter(|o| matches!(o, BookingOutcome::SlotTaken))
            .count();
        assert_eq!((booked, taken), (1, 1));
    }

    #[tokio::test]
    async fn test_leave_resubmission_collapses_to_one_ticket() {
        let store = seeded_store().await;

        let a = store
            .apply_leave("STU00001", "2026-01-10", "2026-01-12", "Medical")
            .await
            .unwrap();
        let b = store
            .apply_leave("STU00001", "2026-01-10", "2026-01-12", "Medical follow-up")
            .await
            .unwrap();
        assert_eq!(a.ticket_id, b.ticket_id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leave_applications")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);

        // Second submission's reason is the one persisted
        let reason: String =
            sqlx::query_scalar("SELECT reason FROM leave_applications WHERE ticket_id = ?1")
                .bind(&a.ticket_id)
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(reason, "Medical follow-up");

        // A different range produces a different ticket
        let c = store
            .apply_leave("STU00001", "2026-01-10", "2026-01-13", "Medical")
            .await
            .unwrap();
        assert_ne!(a.ticket_id, c.ticket_id);
    }

    #[tokio::test]
    async fn test_document_request_upserts() {
        let store = seeded_store().await;
        let a = store
            .request_document("STU00001", DocumentType::Bonafide)
            .await
            .unwrap();
        let b = store
            .request_document("STU00001", DocumentType::Bonafide)
            .await
            .unwrap();
        assert_eq!(a.ticket_id, b.ticket_id);
        assert_eq!(a.eta_days, 2);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM document_requests")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
