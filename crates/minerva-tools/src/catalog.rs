//! The college tool catalog.
//!
//! Eight functions over the record store: five reads and three writes.
//! Write tools carry the confirmation flag; per policy they are
//! single-shot and surface alternatives instead of multi-step
//! confirmation handshakes.

use crate::registry::{Role, ToolRegistry, ToolSpec};
use serde_json::json;

const ALL_ROLES: &[Role] = &[Role::Student, Role::Advisor, Role::Registrar, Role::Admin];
const STUDENT_FACING: &[Role] = &[Role::Student, Role::Advisor, Role::Admin];

/// Build the fixed college catalog.
#[must_use]
pub fn college_catalog() -> ToolRegistry {
    ToolRegistry::new(vec![
        ToolSpec::new(
            "check_attendance",
            "Check attendance percentage for a student in a course.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "student_id": {"type": "string"},
                "course_id": {"type": "string"}
            },
            "required": ["student_id", "course_id"]
        }))
        .with_roles(STUDENT_FACING),
        ToolSpec::new(
            "get_today_schedule",
            "Get the student's schedule for a specific date (defaults to today).",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "student_id": {"type": "string"},
                "date": {"type": "string", "description": "ISO date (YYYY-MM-DD)"}
            },
            "required": ["student_id"]
        }))
        .with_roles(STUDENT_FACING),
        ToolSpec::new(
            "check_fee_status",
            "Check fee status for a student (latest record).",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "student_id": {"type": "string"}
            },
            "required": ["student_id"]
        }))
        .with_roles(STUDENT_FACING),
        ToolSpec::new(
            "get_grades",
            "Get grade and credits for a course in a given semester.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "student_id": {"type": "string"},
                "course_id": {"type": "string"},
                "semester": {"type": "string"}
            },
            "required": ["student_id", "course_id", "semester"]
        }))
        .with_roles(STUDENT_FACING),
        ToolSpec::new(
            "get_exam_schedule",
            "List upcoming exams for a student in a semester.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "student_id": {"type": "string"},
                "semester": {"type": "string"}
            },
            "required": ["student_id", "semester"]
        }))
        .with_roles(STUDENT_FACING),
        ToolSpec::new(
            "book_faculty_appointment",
            "Book a faculty appointment given faculty_id, date, and time_slot.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "student_id": {"type": "string"},
                "faculty_id": {"type": "string"},
                "date": {"type": "string", "description": "ISO date (YYYY-MM-DD)"},
                "time_slot": {"type": "string", "description": "e.g., 14:00-14:30"}
            },
            "required": ["student_id", "faculty_id", "date", "time_slot"]
        }))
        .with_roles(STUDENT_FACING)
        .with_confirmation(),
        ToolSpec::new(
            "apply_for_leave",
            "Submit a leave request for a date range with reason.",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "student_id": {"type": "string"},
                "from_date": {"type": "string"},
                "to_date": {"type": "string"},
                "reason": {"type": "string"}
            },
            "required": ["student_id", "from_date", "to_date", "reason"]
        }))
        .with_roles(STUDENT_FACING)
        .with_confirmation(),
        ToolSpec::new(
            "request_document",
            "Request official documents (Bonafide, ID Card, Transcript, NOC).",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "student_id": {"type": "string"},
                "document_type": {"type": "string"}
            },
            "required": ["student_id", "document_type"]
        }))
        .with_roles(ALL_ROLES)
        .with_confirmation(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_shape() {
        let catalog = college_catalog();
        assert_eq!(catalog.len(), 8);
        assert!(catalog.has("check_attendance"));
        assert!(catalog.has("book_faculty_appointment"));
        assert!(!catalog.has("drop_tables"));
    }

    #[test]
    fn test_write_tools_flagged_for_confirmation() {
        let catalog = college_catalog();
        for name in ["book_faculty_appointment", "apply_for_leave", "request_document"] {
            assert!(catalog.get(name).unwrap().requires_confirmation, "{name}");
        }
        for name in ["check_attendance", "check_fee_status", "get_grades"] {
            assert!(!catalog.get(name).unwrap().requires_confirmation, "{name}");
        }
    }

    #[test]
    fn test_every_tool_requires_student_id() {
        let catalog = college_catalog();
        for spec in catalog.specs() {
            assert!(
                spec.required_params().contains(&"student_id"),
                "{} must require student_id",
                spec.name
            );
        }
    }

    #[test]
    fn test_student_sees_full_catalog() {
        let catalog = college_catalog();
        assert_eq!(catalog.to_llm_tools(Role::Student).len(), 8);
        // Registrar only gets the document tool
        assert_eq!(catalog.to_llm_tools(Role::Registrar).len(), 1);
    }
}
