//! Web API module for Minerva
//!
//! REST endpoints for chat, authentication, student records, feedback,
//! and analytics. Handlers convert every domain outcome into JSON;
//! rejection responses carry a `detail` field.

pub mod analytics;
pub mod auth;
pub mod chat;
pub mod extract;
pub mod health;
pub mod student;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// A structured API rejection: HTTP status plus a `detail` message.
#[derive(Debug)]
pub struct ApiError {
    /// Response status
    pub status: StatusCode,
    /// Human-readable reason
    pub message: String,
}

impl ApiError {
    /// 400 with a reason.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// 401 "authentication required", distinct from not-found.
    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "Authentication required".into(),
        }
    }

    /// 404 with a reason.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    /// 500 with a reason.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.message }))).into_response()
    }
}

impl From<minerva_store::Error> for ApiError {
    fn from(e: minerva_store::Error) -> Self {
        match e {
            minerva_store::Error::InvalidInput(message) => Self::bad_request(message),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<minerva_core::Error> for ApiError {
    fn from(e: minerva_core::Error) -> Self {
        match e {
            minerva_core::Error::EmptyConversation => Self::bad_request(e.to_string()),
            minerva_core::Error::Store(inner) => inner.into(),
            minerva_core::Error::Auth(message) => Self::internal(message),
        }
    }
}
