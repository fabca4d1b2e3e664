//! Prompt assembly and query personalization.

/// Query fragments that refer to the caller's own records.
const PERSONAL_PATTERNS: &[&str] = &[
    "my schedule",
    "my classes",
    "my courses",
    "my attendance",
    "my grades",
    "my fees",
    "my exams",
    "my profile",
];

/// Rewrite a self-referential query to carry the caller's id, so tool
/// calls resolve to the correct record without the model inferring
/// identity from history. Returns `None` when the query is not personal
/// or already names the id; the id is appended at most once.
#[must_use]
pub fn personalize_query(query: &str, student_id: &str) -> Option<String> {
    let lowered = query.to_lowercase();
    let is_personal = PERSONAL_PATTERNS
        .iter()
        .any(|pattern| lowered.contains(pattern));

    if is_personal && !query.contains(student_id) {
        Some(format!("{query} (student_id: {student_id})"))
    } else {
        None
    }
}

/// The persona and guardrail instruction.
#[must_use]
pub fn system_prompt(college_name: &str, student_context: Option<&str>) -> String {
    let mut prompt = format!(
        "You are a helpful college assistant for {college_name}. \
         You help students with course information, schedules, faculty details, \
         campus facilities, and administrative queries. \
         Be concise, friendly, and accurate. If unsure, say so. \
         Always cite sources when available."
    );

    if let Some(context) = student_context {
        prompt.push_str("\nStudent context: ");
        prompt.push_str(context);
    }

    prompt.push_str(
        "\nInstructions:\
         \n- Prefer factual, grounded answers over speculation.\
         \n- Cite sources in-line (e.g., [catalog], [faculty], [handbook]) when data is provided.\
         \n- Keep responses short unless the user asks for detail.",
    );
    prompt
}

/// The retrieved-context system message. The "no documents found" marker
/// is distinguishable downstream from present-but-irrelevant context.
#[must_use]
pub fn context_block(block: Option<&str>) -> String {
    match block {
        Some(text) => format!("Context:\n{text}"),
        None => "Context: (no documents found)".to_string(),
    }
}
