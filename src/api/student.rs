//! Authenticated student record endpoints.

use super::extract::RequireStudent;
use super::ApiError;
use crate::server::AppState;
use axum::extract::{Query, State};
use axum::Json;
use minerva_store::{AttendanceRecord, BookingOutcome, ScheduleEntry, StudentProfile};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Current student's full profile.
pub async fn profile(
    State(state): State<AppState>,
    RequireStudent(claims): RequireStudent,
) -> Result<Json<StudentProfile>, ApiError> {
    state
        .store
        .get_student_profile(&claims.sub)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Profile not found"))
}

/// Attendance query parameters
#[derive(Debug, Deserialize)]
pub struct AttendanceParams {
    /// Restrict to one course
    pub course_id: Option<String>,
}

/// Attendance response for the full-course listing
#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    /// Caller id
    pub student_id: String,
    /// Number of records
    pub count: usize,
    /// Records, worst percentage first
    pub attendance: Vec<AttendanceRecord>,
}

/// Attendance records, for one course or all of them.
pub async fn attendance(
    State(state): State<AppState>,
    RequireStudent(claims): RequireStudent,
    Query(params): Query<AttendanceParams>,
) -> Result<Json<Value>, ApiError> {
    if let Some(course_id) = params.course_id {
        let record = state.store.get_attendance(&claims.sub, &course_id).await?;
        return Ok(Json(match record {
            Some(record) => json!({"found": true, "student_id": claims.sub, "record": record}),
            None => json!({
                "found": false,
                "message": format!("No attendance record for {} in {course_id}.", claims.sub),
            }),
        }));
    }

    let records = state.store.list_attendance(&claims.sub).await?;
    Ok(Json(serde_json::to_value(AttendanceResponse {
        student_id: claims.sub,
        count: records.len(),
        attendance: records,
    })?))
}

/// Schedule query parameters
#[derive(Debug, Deserialize)]
pub struct ScheduleParams {
    /// Date in YYYY-MM-DD format (defaults to today)
    pub date: Option<String>,
}

/// Schedule response body
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    /// Caller id
    pub student_id: String,
    /// Date the schedule covers
    pub date: String,
    /// Number of classes
    pub count: usize,
    /// Classes
    pub classes: Vec<ScheduleEntry>,
}

/// Class schedule for a date.
pub async fn schedule(
    State(state): State<AppState>,
    RequireStudent(claims): RequireStudent,
    Query(params): Query<ScheduleParams>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let classes = state
        .store
        .get_schedule(&claims.sub, params.date.as_deref())
        .await?;
    let date = classes
        .first()
        .map(|entry| entry.date.clone())
        .or(params.date)
        .unwrap_or_else(|| chrono::Utc::now().date_naive().to_string());

    Ok(Json(ScheduleResponse {
        student_id: claims.sub,
        date,
        count: classes.len(),
        classes,
    }))
}

/// Latest fee record, 404 when none exists.
pub async fn fees(
    State(state): State<AppState>,
    RequireStudent(claims): RequireStudent,
) -> Result<Json<Value>, ApiError> {
    let Some(fee) = state.store.get_fee_status(&claims.sub).await? else {
        return Err(ApiError::not_found("No fee records found"));
    };
    Ok(Json(json!({
        "found": true,
        "student_id": claims.sub,
        "fee": fee,
    })))
}

/// Appointment request body
#[derive(Debug, Deserialize)]
pub struct AppointmentRequest {
    /// Faculty to meet
    pub faculty_id: String,
    /// Date (YYYY-MM-DD)
    pub date: String,
    /// Slot, e.g. "10:00-10:30"
    pub time_slot: String,
}

/// Book a faculty appointment directly (outside the chat loop).
pub async fn book_appointment(
    State(state): State<AppState>,
    RequireStudent(claims): RequireStudent,
    Json(payload): Json<AppointmentRequest>,
) -> Result<Json<Value>, ApiError> {
    match state
        .store
        .book_appointment(&claims.sub, &payload.faculty_id, &payload.date, &payload.time_slot)
        .await?
    {
        BookingOutcome::Booked { appointment_id } => Ok(Json(json!({
            "ok": true,
            "appointment_id": appointment_id,
            "student_id": claims.sub,
            "faculty_id": payload.faculty_id,
            "date": payload.date,
            "time_slot": payload.time_slot,
            "message": format!(
                "Appointment confirmed for {} at {} (ID: {appointment_id}).",
                payload.date, payload.time_slot
            ),
        }))),
        BookingOutcome::SlotTaken => Err(ApiError::bad_request(
            "Slot unavailable; choose another time.",
        )),
    }
}

/// Leave request body
#[derive(Debug, Deserialize)]
pub struct LeaveRequest {
    /// First day of leave (YYYY-MM-DD)
    pub from_date: String,
    /// Last day of leave (YYYY-MM-DD)
    pub to_date: String,
    /// Stated reason
    pub reason: String,
}

/// File a leave application (idempotent on the date range).
pub async fn apply_leave(
    State(state): State<AppState>,
    RequireStudent(claims): RequireStudent,
    Json(payload): Json<LeaveRequest>,
) -> Result<Json<Value>, ApiError> {
    let ticket = state
        .store
        .apply_leave(&claims.sub, &payload.from_date, &payload.to_date, &payload.reason)
        .await?;

    Ok(Json(json!({
        "ok": true,
        "ticket": ticket,
        "message": format!("Leave request submitted. Ticket: {}", ticket.ticket_id),
    })))
}
