//! Account profile model

use std::fmt;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use super::record::{Record, RecordId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Shared with the auth identity
    pub id: RecordId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect();
        if parts.is_empty() {
            self.email.clone().unwrap_or_else(|| self.id.to_string())
        } else {
            parts.join(" ")
        }
    }

    /// Advisory only: real enforcement lives in the backend's access rules
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Record for Profile {
    const TABLE: &'static str = "profiles";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Authorization tier, set at signup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "customer")]
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

/// Signup and profile-edit payload, written with upsert semantics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileUpsert {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Editable profile fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileEdit {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_customer_role_decodes_as_user() {
        let profile = Profile::from_row(json!({"id": "u1", "role": "customer"})).unwrap();
        assert_eq!(profile.role, Role::User);
        assert!(!profile.is_admin());
    }

    #[test]
    fn test_missing_role_defaults_to_user() {
        let profile = Profile::from_row(json!({"id": "u1"})).unwrap();
        assert_eq!(profile.role, Role::User);
    }

    #[test]
    fn test_display_name() {
        let mut profile = Profile::from_row(json!({
            "id": "u1", "first_name": "Ada", "last_name": "Lovelace", "role": "admin"
        }))
        .unwrap();
        assert_eq!(profile.display_name(), "Ada Lovelace");
        assert!(profile.is_admin());

        profile.first_name = None;
        profile.last_name = Some(String::new());
        profile.email = Some("ada@example.com".to_string());
        assert_eq!(profile.display_name(), "ada@example.com");
    }
}
