//! Identity: credential checks and bearer tokens.
//!
//! Tokens are HS256 JWTs with a fixed expiry window. Verification treats
//! expired, malformed, and absent tokens identically: the caller is
//! anonymous. "Wrong password" and "no such student" are likewise
//! indistinguishable to the caller.

use crate::error::{Error, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use minerva_store::{RecordStore, Student};
use minerva_tools::Role;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Default token lifetime.
pub const DEFAULT_TOKEN_EXPIRY_HOURS: i64 = 24;

/// Claims carried in a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Student id
    pub sub: String,
    /// Student name (for display)
    pub name: String,
    /// Department (for display)
    pub department: String,
    /// Caller role
    #[serde(default = "default_role")]
    pub role: Role,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

fn default_role() -> Role {
    Role::Student
}

/// The identity capability consumed by the HTTP surface.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Validate credentials. `None` covers both unknown ids and wrong
    /// passwords.
    async fn authenticate(&self, student_id: &str, password: &str) -> Result<Option<Student>>;

    /// Issue a bearer token for an authenticated student.
    fn issue_token(&self, student: &Student) -> Result<String>;

    /// Verify a bearer token. `None` for expired or malformed tokens,
    /// indistinguishable from absent.
    fn verify_token(&self, token: &str) -> Option<Claims>;
}

/// JWT + bcrypt identity over the record store.
pub struct JwtIdentity {
    store: RecordStore,
    secret: String,
    expiry_hours: i64,
}

impl JwtIdentity {
    /// Create an identity provider.
    #[must_use]
    pub fn new(store: RecordStore, secret: impl Into<String>) -> Self {
        Self {
            store,
            secret: secret.into(),
            expiry_hours: DEFAULT_TOKEN_EXPIRY_HOURS,
        }
    }

    /// Override the token lifetime.
    #[must_use]
    pub fn with_expiry_hours(mut self, hours: i64) -> Self {
        self.expiry_hours = hours;
        self
    }
}

#[async_trait::async_trait]
impl IdentityProvider for JwtIdentity {
    #[instrument(skip(self, password))]
    async fn authenticate(&self, student_id: &str, password: &str) -> Result<Option<Student>> {
        let Some((student, hash)) = self.store.get_credentials(student_id).await? else {
            debug!(student_id, "Login attempt for unknown student");
            return Ok(None);
        };
        let Some(hash) = hash else {
            debug!(student_id, "Student has no password on file");
            return Ok(None);
        };

        match bcrypt::verify(password, &hash) {
            Ok(true) => Ok(Some(student)),
            Ok(false) => Ok(None),
            Err(e) => {
                warn!(student_id, error = %e, "Stored password hash is unusable");
                Ok(None)
            }
        }
    }

    fn issue_token(&self, student: &Student) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: student.student_id.clone(),
            name: student.name.clone(),
            department: student.department.clone(),
            role: Role::Student,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| Error::Auth(e.to_string()))
    }

    fn verify_token(&self, token: &str) -> Option<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .ok()
    }
}
