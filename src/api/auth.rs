//! Login endpoint: credentials in, bearer token plus profile out.

use super::ApiError;
use crate::server::AppState;
use axum::extract::State;
use axum::Json;
use minerva_store::StudentProfile;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Student id
    pub student_id: String,
    /// Password
    pub password: String,
}

/// Login response body. Failed logins come back with `success: false`
/// rather than an HTTP error, so the UI can render the message directly.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Whether authentication succeeded
    pub success: bool,
    /// Bearer token on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Full profile on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<StudentProfile>,
    /// Human-readable outcome
    pub message: String,
}

/// Authenticate a student and issue a token.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Some(student) = state
        .identity
        .authenticate(&payload.student_id, &payload.password)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
    else {
        return Ok(Json(LoginResponse {
            success: false,
            token: None,
            profile: None,
            message: "Invalid student_id or password".into(),
        }));
    };

    let Some(profile) = state.store.get_student_profile(&student.student_id).await? else {
        return Ok(Json(LoginResponse {
            success: false,
            token: None,
            profile: None,
            message: "Could not fetch student profile".into(),
        }));
    };

    let token = state
        .identity
        .issue_token(&student)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    info!(student_id = %student.student_id, "Student logged in");

    Ok(Json(LoginResponse {
        success: true,
        token: Some(token),
        profile: Some(profile),
        message: format!("Welcome, {}!", student.name),
    }))
}
