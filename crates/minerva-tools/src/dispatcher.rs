//! Dispatcher - validated execution of model-requested tool calls.
//!
//! Validation order: known tool, role access, argument shape, caller
//! injection, caller existence, then dispatch. Every failure mode comes
//! back as a structured result (`ok: false` plus a message); nothing here
//! raises across the chat turn, so the model always gets something it can
//! recover from.

use crate::error::{Error, Result};
use crate::registry::{Role, ToolRegistry};
use minerva_store::{BookingOutcome, DocumentType, RecordStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default bookable slot grid per faculty member per day.
pub const DEFAULT_SLOTS: &[&str] = &[
    "09:00-09:30",
    "10:00-10:30",
    "14:00-14:30",
    "16:00-16:30",
];

/// Resolved caller identity, injected into caller-scoped arguments.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Authenticated student id
    pub student_id: String,
    /// Role from the identity claims
    pub role: Role,
}

impl Caller {
    /// A student caller.
    #[must_use]
    pub fn student(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            role: Role::Student,
        }
    }
}

/// One executed (or rejected) tool call.
#[derive(Debug, Clone)]
pub struct ToolExecution {
    /// Function name as requested
    pub name: String,
    /// Structured result fed back to the model
    pub result: Value,
    /// One-line human-readable summary for the turn's action log
    pub summary: String,
    /// False when the call was rejected or the function reported failure
    pub ok: bool,
}

impl ToolExecution {
    fn new(name: &str, result: Value) -> Self {
        let ok = result.get("ok").and_then(Value::as_bool).unwrap_or(true);
        let summary = match result.get("message").and_then(Value::as_str) {
            Some(message) => format!("{name}: {message}"),
            None => format!("{name}: {result}"),
        };
        Self {
            name: name.to_string(),
            result,
            summary,
            ok,
        }
    }

    fn rejected(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, json!({"ok": false, "message": message.into()}))
    }

    /// A failed call that never reached the dispatcher (e.g. the model
    /// produced unparsable arguments). The diagnostic is fed back to the
    /// model like any other tool result.
    #[must_use]
    pub fn failure(name: &str, message: impl Into<String>) -> Self {
        Self::rejected(name, message)
    }
}

/// Validated tool dispatcher over the record store.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    store: RecordStore,
}

impl Dispatcher {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, store: RecordStore) -> Self {
        Self { registry, store }
    }

    /// The catalog backing this dispatcher.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute one tool call. Never fails: all outcomes are structured.
    #[instrument(skip(self, args, caller), fields(tool = %name))]
    pub async fn execute(&self, name: &str, args: Value, caller: Option<&Caller>) -> ToolExecution {
        let Some(spec) = self.registry.get(name) else {
            return ToolExecution::rejected(name, format!("Unknown function: {name}"));
        };

        let role = caller.map_or(Role::Student, |c| c.role);
        if !spec.allows(role) {
            warn!(tool = name, role = %role, "Tool invocation denied by role");
            return ToolExecution::rejected(
                name,
                format!("Function {name} is not available to {role} callers"),
            );
        }

        let Some(mut args) = args.as_object().cloned() else {
            return ToolExecution::rejected(name, "Arguments must be a JSON object");
        };

        // Authenticated callers act on their own records: the injected id
        // wins over anything the model supplied.
        if let Some(caller) = caller {
            args.insert("student_id".to_string(), json!(caller.student_id));
        }

        for required in spec.required_params() {
            let missing = match args.get(required) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            };
            if missing {
                return ToolExecution::rejected(
                    name,
                    format!("Missing required argument: {required}"),
                );
            }
        }

        // Caller-scoped calls short-circuit before any side effect when
        // the student id is unknown.
        if let Some(student_id) = str_arg(&args, "student_id") {
            match self.store.student_exists(&student_id).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(tool = name, %student_id, "Rejecting call for unknown student");
                    return ToolExecution::rejected(name, "Invalid student_id");
                }
                Err(e) => {
                    warn!(tool = name, error = %e, "Student validation failed");
                    return ToolExecution::rejected(
                        name,
                        format!("Could not validate student record: {e}"),
                    );
                }
            }
        }

        let result = self.dispatch(name, &args).await;
        match result {
            Ok(value) => ToolExecution::new(name, value),
            Err(e) => {
                warn!(tool = name, error = %e, "Function execution error");
                ToolExecution::rejected(name, format!("Function execution error: {e}"))
            }
        }
    }

    async fn dispatch(&self, name: &str, args: &serde_json::Map<String, Value>) -> Result<Value> {
        match name {
            "check_attendance" => {
                self.check_attendance(&req(args, "student_id")?, &req(args, "course_id")?)
                    .await
            }
            "get_today_schedule" => {
                self.get_today_schedule(&req(args, "student_id")?, str_arg(args, "date"))
                    .await
            }
            "check_fee_status" => self.check_fee_status(&req(args, "student_id")?).await,
            "get_grades" => {
                self.get_grades(
                    &req(args, "student_id")?,
                    &req(args, "course_id")?,
                    &req(args, "semester")?,
                )
                .await
            }
            "get_exam_schedule" => {
                self.get_exam_schedule(&req(args, "student_id")?, &req(args, "semester")?)
                    .await
            }
            "book_faculty_appointment" => {
                self.book_faculty_appointment(
                    &req(args, "student_id")?,
                    &req(args, "faculty_id")?,
                    &req(args, "date")?,
                    &req(args, "time_slot")?,
                )
                .await
            }
            "apply_for_leave" => {
                self.apply_for_leave(
                    &req(args, "student_id")?,
                    &req(args, "from_date")?,
                    &req(args, "to_date")?,
                    &req(args, "reason")?,
                )
                .await
            }
            "request_document" => {
                self.request_document(&req(args, "student_id")?, &req(args, "document_type")?)
                    .await
            }
            // Registry lookup happened before dispatch
            other => Err(Error::InvalidArguments(format!("unknown function {other}"))),
        }
    }

    // ── Read tools ──────────────────────────────────────────────

    async fn check_attendance(&self, student_id: &str, course_id: &str) -> Result<Value> {
        let Some(record) = self.store.get_attendance(student_id, course_id).await? else {
            return Ok(json!({
                "found": false,
                "message": format!("No attendance record for {student_id} in {course_id}."),
            }));
        };

        let mut message = format!(
            "Your attendance in {}: {:.0}% ({}/{} classes)",
            record.course_name, record.percentage, record.attended, record.total_classes
        );
        if record.alert {
            message.push_str(" (below 75% threshold)");
        }

        Ok(json!({
            "found": true,
            "student_id": student_id,
            "course_id": course_id,
            "course_name": record.course_name,
            "total_classes": record.total_classes,
            "attended": record.attended,
            "percentage": record.percentage,
            "alert": record.alert,
            "message": message,
        }))
    }

    async fn get_today_schedule(&self, student_id: &str, date: Option<String>) -> Result<Value> {
        let classes = self.store.get_schedule(student_id, date.as_deref()).await?;
        let date = classes
            .first()
            .map(|entry| entry.date.clone())
            .or(date)
            .unwrap_or_else(|| chrono::Utc::now().date_naive().to_string());

        Ok(json!({
            "student_id": student_id,
            "date": date,
            "count": classes.len(),
            "classes": classes,
            "message": format!("Schedule for {student_id} on {date}: {} class(es)", classes.len()),
        }))
    }

    async fn check_fee_status(&self, student_id: &str) -> Result<Value> {
        let Some(fee) = self.store.get_fee_status(student_id).await? else {
            return Ok(json!({
                "found": false,
                "message": format!("No fee record for {student_id}."),
            }));
        };

        Ok(json!({
            "found": true,
            "student_id": student_id,
            "total": fee.total_fees,
            "paid": fee.paid_amount,
            "due": fee.due_amount,
            "due_date": fee.due_date,
            "status": fee.status,
            "semester": fee.semester,
            "message": format!(
                "Fees for {}: total {:.2}, paid {:.2}, due {:.2}, due date {} (status: {}).",
                fee.semester, fee.total_fees, fee.paid_amount, fee.due_amount, fee.due_date, fee.status
            ),
        }))
    }

    async fn get_grades(&self, student_id: &str, course_id: &str, semester: &str) -> Result<Value> {
        let Some(grade) = self.store.get_grade(student_id, course_id, semester).await? else {
            return Ok(json!({
                "found": false,
                "message": format!("No grade found for {student_id} in {course_id} ({semester})."),
            }));
        };

        Ok(json!({
            "found": true,
            "student_id": student_id,
            "course_id": course_id,
            "course_name": grade.course_name,
            "semester": semester,
            "grade": grade.grade,
            "credits": grade.credits,
            "message": format!(
                "Grade for {} ({}): {} | Credits: {}",
                grade.course_name,
                semester,
                grade.grade.as_deref().unwrap_or("N/A"),
                grade.credits
            ),
        }))
    }

    async fn get_exam_schedule(&self, student_id: &str, semester: &str) -> Result<Value> {
        let exams = self.store.get_exam_schedule(student_id, semester).await?;
        if exams.is_empty() {
            return Ok(json!({
                "found": false,
                "message": format!("No exams scheduled for {semester}."),
            }));
        }

        Ok(json!({
            "found": true,
            "student_id": student_id,
            "semester": semester,
            "count": exams.len(),
            "exams": exams,
            "message": format!("Exams for {semester}: {} found", exams.len()),
        }))
    }

    // ── Write tools ─────────────────────────────────────────────

    /// Single-shot booking: infeasible requests return the viable
    /// alternatives instead of performing a side effect.
    async fn book_faculty_appointment(
        &self,
        student_id: &str,
        faculty_id: &str,
        date: &str,
        time_slot: &str,
    ) -> Result<Value> {
        let available = self.available_slots(faculty_id, date).await?;
        if !available.iter().any(|slot| slot == time_slot) {
            return Ok(json!({
                "ok": false,
                "message": "Slot unavailable; choose another time.",
                "available_slots": available,
            }));
        }

        match self
            .store
            .book_appointment(student_id, faculty_id, date, time_slot)
            .await?
        {
            BookingOutcome::Booked { appointment_id } => {
                let faculty_name = self
                    .store
                    .faculty_name(faculty_id)
                    .await?
                    .unwrap_or_else(|| faculty_id.to_string());
                Ok(json!({
                    "ok": true,
                    "appointment_id": appointment_id,
                    "student_id": student_id,
                    "faculty_id": faculty_id,
                    "faculty_name": faculty_name,
                    "date": date,
                    "time_slot": time_slot,
                    "message": format!(
                        "Appointment with {faculty_name} confirmed for {date} at {time_slot} (ID: {appointment_id})."
                    ),
                }))
            }
            // Lost the race between availability check and insert
            BookingOutcome::SlotTaken => {
                let available = self.available_slots(faculty_id, date).await?;
                Ok(json!({
                    "ok": false,
                    "message": "Slot unavailable; choose another time.",
                    "available_slots": available,
                }))
            }
        }
    }

    async fn apply_for_leave(
        &self,
        student_id: &str,
        from_date: &str,
        to_date: &str,
        reason: &str,
    ) -> Result<Value> {
        let ticket = self
            .store
            .apply_leave(student_id, from_date, to_date, reason)
            .await?;

        Ok(json!({
            "ok": true,
            "ticket_id": ticket.ticket_id,
            "student_id": student_id,
            "from_date": from_date,
            "to_date": to_date,
            "reason": reason,
            "status": ticket.status,
            "message": format!("Leave request submitted. Ticket: {}", ticket.ticket_id),
        }))
    }

    async fn request_document(&self, student_id: &str, document_type: &str) -> Result<Value> {
        let Some(doc_type) = DocumentType::parse(document_type) else {
            return Ok(json!({
                "ok": false,
                "message": format!(
                    "Unsupported document type. Choose from: {}",
                    DocumentType::supported().join(", ")
                ),
            }));
        };

        let ticket = self.store.request_document(student_id, doc_type).await?;

        Ok(json!({
            "ok": true,
            "ticket_id": ticket.ticket_id,
            "student_id": student_id,
            "document_type": doc_type.as_str(),
            "eta_days": ticket.eta_days,
            "status": ticket.status,
            "message": format!(
                "Request submitted. Ticket: {}. Estimated completion: {} day(s).",
                ticket.ticket_id, ticket.eta_days
            ),
        }))
    }

    /// Default slot grid minus already-booked slots.
    async fn available_slots(&self, faculty_id: &str, date: &str) -> Result<Vec<String>> {
        let taken = self.store.booked_slots(faculty_id, date).await?;
        Ok(DEFAULT_SLOTS
            .iter()
            .map(|slot| (*slot).to_string())
            .filter(|slot| !taken.contains(slot))
            .collect())
    }
}

fn str_arg(args: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(str::to_string)
}

fn req(args: &serde_json::Map<String, Value>, key: &str) -> Result<String> {
    str_arg(args, key).ok_or_else(|| Error::InvalidArguments(format!("missing {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::college_catalog;

    async fn dispatcher() -> Dispatcher {
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
            .upsert_attendance("STU00001", "CS101", 40, 28, "Fall 2025")
            .await
            .unwrap();
        Dispatcher::new(Arc::new(college_catalog()), store)
    }

    #[tokio::test]
    async fn test_unknown_function_is_structured_failure() {
        let dispatcher = dispatcher().await;
        let exec = dispatcher.execute("launch_rocket", json!({}), None).await;
        assert!(!exec.ok);
        assert!(exec.result["message"]
            .as_str()
            .unwrap()
            .contains("Unknown function"));
    }

    #[tokio::test]
    async fn test_missing_required_argument_named() {
        let dispatcher = dispatcher().await;
        let exec = dispatcher
            .execute(
                "check_attendance",
                json!({"student_id": "STU00001"}),
                None,
            )
            .await;
        assert!(!exec.ok);
        assert!(exec.result["message"]
            .as_str()
            .unwrap()
            .contains("course_id"));
    }

    #[tokio::test]
    async fn test_unknown_student_short_circuits() {
        let dispatcher = dispatcher().await;
        let exec = dispatcher
            .execute(
                "check_attendance",
                json!({"student_id": "STU99999", "course_id": "CS101"}),
                None,
            )
            .await;
        assert!(!exec.ok);
        assert_eq!(exec.result["message"], "Invalid student_id");
    }

    #[tokio::test]
    async fn test_caller_injection_overrides_model_arguments() {
        let dispatcher = dispatcher().await;
        let caller = Caller::student("STU00001");
        // Model tried to read someone else's record
        let exec = dispatcher
            .execute(
                "check_attendance",
                json!({"student_id": "STU99999", "course_id": "CS101"}),
                Some(&caller),
            )
            .await;
        assert!(exec.ok);
        assert_eq!(exec.result["student_id"], "STU00001");
        assert_eq!(exec.result["attended"], 28);
        assert_eq!(exec.result["alert"], true);
    }

    #[tokio::test]
    async fn test_attendance_summary_line() {
        let dispatcher = dispatcher().await;
        let exec = dispatcher
            .execute(
                "check_attendance",
                json!({"student_id": "STU00001", "course_id": "CS101"}),
                None,
            )
            .await;
        assert!(exec.ok);
        assert!(exec.summary.starts_with("check_attendance:"));
        assert!(exec.summary.contains("70%"));
    }

    #[tokio::test]
    async fn test_role_denied() {
        let dispatcher = dispatcher().await;
        let caller = Caller {
            student_id: "STU00001".into(),
            role: Role::Registrar,
        };
        let exec = dispatcher
            .execute(
                "book_faculty_appointment",
                json!({"faculty_id": "F001", "date": "2026-01-05", "time_slot": "10:00-10:30"}),
                Some(&caller),
            )
            .await;
        assert!(!exec.ok);
        assert!(exec.result["message"].as_str().unwrap().contains("registrar"));
    }

    #[tokio::test]
    async fn test_booking_happy_path_then_alternatives() {
        let dispatcher = dispatcher().await;
        let caller = Caller::student("STU00001");
        let args = json!({
            "faculty_id": "F001",
            "date": "2026-01-05",
            "time_slot": "10:00-10:30"
        });

        let first = dispatcher
            .execute("book_faculty_appointment", args.clone(), Some(&caller))
            .await;
        assert!(first.ok);
        assert!(first.result["appointment_id"].is_i64());

        let second = dispatcher
            .execute("book_faculty_appointment", args, Some(&caller))
            .await;
        assert!(!second.ok);
        let alternatives: Vec<String> =
            serde_json::from_value(second.result["available_slots"].clone()).unwrap();
        assert!(!alternatives.contains(&"10:00-10:30".to_string()));
        assert!(alternatives.contains(&"09:00-09:30".to_string()));
    }

    #[tokio::test]
    async fn test_unlisted_slot_rejected_without_side_effect() {
        let dispatcher = dispatcher().await;
        let caller = Caller::student("STU00001");
        let exec = dispatcher
            .execute(
                "book_faculty_appointment",
                json!({"faculty_id": "F001", "date": "2026-01-05", "time_slot": "23:00-23:30"}),
                Some(&caller),
            )
            .await;
        assert!(!exec.ok);
        assert_eq!(exec.result["available_slots"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_leave_and_document_tickets() {
        let dispatcher = dispatcher().await;
        let caller = Caller::student("STU00001");

        let leave = dispatcher
            .execute(
                "apply_for_leave",
                json!({"from_date": "2026-01-10", "to_date": "2026-01-12", "reason": "Medical"}),
                Some(&caller),
            )
            .await;
        assert!(leave.ok);
        assert_eq!(leave.result["ticket_id"], "LV-STU00001-20260110-20260112");

        let doc = dispatcher
            .execute(
                "request_document",
                json!({"document_type": "Bonafide"}),
                Some(&caller),
            )
            .await;
        assert!(doc.ok);
        assert_eq!(doc.result["eta_days"], 2);

        let bad = dispatcher
            .execute(
                "request_document",
                json!({"document_type": "Diploma"}),
                Some(&caller),
            )
            .await;
        assert!(!bad.ok);
        assert!(bad.result["message"]
            .as_str()
            .unwrap()
            .contains("Unsupported document type"));
    }

    #[tokio::test]
    async fn test_non_object_arguments_rejected() {
        let dispatcher = dispatcher().await;
        let exec = dispatcher
            .execute("check_fee_status", json!("not an object"), None)
            .await;
        assert!(!exec.ok);
    }
}
