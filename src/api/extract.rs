//! Caller extraction from bearer tokens.
//!
//! `CurrentStudent` never rejects: expired, malformed, and absent tokens
//! all yield an anonymous caller. `RequireStudent` rejects anonymous
//! callers with an explicit "authentication required" response, distinct
//! from not-found.

use super::ApiError;
use crate::server::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use minerva_core::Claims;

/// The optionally-authenticated caller.
pub struct CurrentStudent(pub Option<Claims>);

/// An authenticated caller, or a 401 rejection.
pub struct RequireStudent(pub Claims);

fn claims_from_parts(parts: &Parts, state: &AppState) -> Option<Claims> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?;
    state.identity.verify_token(token)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(claims_from_parts(parts, state)))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        claims_from_parts(parts, state)
            .map(Self)
            .ok_or_else(ApiError::unauthorized)
    }
}
