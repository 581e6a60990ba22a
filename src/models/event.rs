//! Event model

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize};
use chrono::{DateTime, Utc};
use crate::utils::errors::{EventHubError, Result};
use super::record::{timestamp, Record, RecordId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: RecordId,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(deserialize_with = "timestamp")]
    pub date_time: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub location: String,
    #[serde(default, deserialize_with = "optional_category")]
    pub category: Option<EventCategory>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
    pub created_by: RecordId,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Record for Event {
    const TABLE: &'static str = "events";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Moderation state of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(EventStatus::Pending),
            "approved" => Ok(EventStatus::Approved),
            "rejected" => Ok(EventStatus::Rejected),
            other => Err(EventHubError::InvalidInput(format!("Unknown event status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Conference,
    Concert,
    Workshop,
    Sports,
    Exhibition,
}

impl EventCategory {
    pub const ALL: [EventCategory; 5] = [
        EventCategory::Conference,
        EventCategory::Concert,
        EventCategory::Workshop,
        EventCategory::Sports,
        EventCategory::Exhibition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Conference => "conference",
            EventCategory::Concert => "concert",
            EventCategory::Workshop => "workshop",
            EventCategory::Sports => "sports",
            EventCategory::Exhibition => "exhibition",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventCategory {
    type Err = EventHubError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        EventCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| EventHubError::InvalidInput(format!("Unknown event category: {}", s)))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Absent, null and empty categories all mean "no category"
fn optional_category<'de, D>(deserializer: D) -> std::result::Result<Option<EventCategory>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Payload for creating an event. Status is always `pending` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date_time: DateTime<Utc>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<EventCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_by: RecordId,
    status: EventStatus,
}

impl NewEvent {
    pub fn new(title: impl Into<String>, date_time: DateTime<Utc>, created_by: RecordId) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            date_time,
            location: String::new(),
            category: None,
            image_url: None,
            created_by,
            status: EventStatus::Pending,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_category(mut self, category: EventCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    /// Reject payloads the form layer should never have submitted
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(EventHubError::InvalidInput("Event title is required".to_string()));
        }
        Ok(())
    }
}

/// General update patch. Has no status field: status changes go through
/// [`StatusChange`] only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<EventCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl EventUpdate {
    pub fn is_empty(&self) -> bool {
        self == &EventUpdate::default()
    }
}

/// Patch restricted to the `status` column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusChange {
    pub status: EventStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> serde_json::Value {
        json!({
            "id": "e1",
            "title": "Launch",
            "description": null,
            "date_time": "2025-01-01T10:00:00+00:00",
            "location": "Berlin",
            "category": "",
            "image_url": null,
            "status": "approved",
            "created_by": "u1",
            "created_at": "2024-12-01T08:00:00Z"
        })
    }

    #[test]
    fn test_decode_row() {
        let event = Event::from_row(row()).unwrap();
        assert_eq!(event.id, RecordId::new("e1"));
        assert_eq!(event.description, "");
        assert_eq!(event.category, None);
        assert_eq!(event.status, EventStatus::Approved);
    }

    #[test]
    fn test_decode_naive_date_time_as_utc() {
        let mut naive = row();
        naive["date_time"] = json!("2025-01-02T10:00");
        naive["created_at"] = json!("2024-12-01 08:00:00.123456");
        let event = Event::from_row(naive).unwrap();
        assert_eq!(event.date_time.to_rfc3339(), "2025-01-02T10:00:00+00:00");
        assert_eq!(event.created_at.timestamp_subsec_micros(), 123_456);
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let mut bad = row();
        bad["status"] = json!("archived");
        assert!(Event::from_row(bad).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_category() {
        let mut bad = row();
        bad["category"] = json!("party");
        assert!(Event::from_row(bad).is_err());
    }

    #[test]
    fn test_new_event_is_always_pending() {
        let new_event = NewEvent::new("Launch", Utc::now(), RecordId::new("u1"))
            .with_category(EventCategory::Concert);
        let value = serde_json::to_value(&new_event).unwrap();
        assert_eq!(value["status"], json!("pending"));
        assert_eq!(value["category"], json!("concert"));
        assert!(value.get("image_url").is_none());
    }

    #[test]
    fn test_update_patch_never_carries_status() {
        let update = EventUpdate {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, json!({"title": "Renamed"}));
        assert!(EventUpdate::default().is_empty());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Approved".parse::<EventStatus>().unwrap(), EventStatus::Approved);
        assert!("done".parse::<EventStatus>().is_err());
        assert_eq!("sports".parse::<EventCategory>().unwrap(), EventCategory::Sports);
    }

    #[test]
    fn test_validate_requires_title() {
        let new_event = NewEvent::new("   ", Utc::now(), RecordId::new("u1"));
        assert!(new_event.validate().is_err());
    }
}
