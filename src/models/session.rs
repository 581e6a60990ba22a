//! Authentication identities and sessions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use chrono::{DateTime, Utc};
use super::record::RecordId;

/// Identity returned by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: RecordId,
    #[serde(default)]
    pub email: Option<String>,
    /// Attributes supplied at signup (role, names)
    #[serde(default)]
    pub user_metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|at| at <= Utc::now()).unwrap_or(false)
    }
}

/// Result of a signup: the session is absent when the backend requires
/// email confirmation first
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<Session>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
}

/// One `(event, session)` pair delivered by the auth state listener
#[derive(Debug, Clone, PartialEq)]
pub struct AuthStateChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}
