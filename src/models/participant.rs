//! Participant model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::is_valid_email;
use super::record::{timestamp, Record, RecordId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    #[serde(deserialize_with = "timestamp")]
    pub added_at: DateTime<Utc>,
    pub added_by: RecordId,
    pub event_id: RecordId,
}

impl Record for Participant {
    const TABLE: &'static str = "participants";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Registration payload, always scoped to exactly one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewParticipant {
    pub name: String,
    pub email: String,
    pub added_by: RecordId,
    pub event_id: RecordId,
}

impl NewParticipant {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        added_by: RecordId,
        event_id: RecordId,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_string(),
            added_by,
            event_id,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(EventHubError::InvalidInput("Participant name is required".to_string()));
        }
        if !is_valid_email(&self.email) {
            return Err(EventHubError::InvalidInput(format!("Invalid email address: {}", self.email)));
        }
        Ok(())
    }
}
