//! Test data helpers for creating rows and payloads
//!
//! Rows are built as the backend would return them; names and emails are
//! generated with `fake` where their exact value does not matter.

use chrono::{DateTime, TimeZone, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use fake::Fake;
use serde_json::{json, Value};
use eventhub::models::{NewEvent, NewParticipant, RecordId};

/// Start time of the launch event used across scenarios
pub fn launch_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap()
}

/// A complete `events` row
pub fn event_row(id: &str, title: &str, date_time: &str, status: &str, created_by: &str) -> Value {
    let description: String = Sentence(3..8).fake();
    json!({
        "id": id,
        "title": title,
        "description": description,
        "date_time": date_time,
        "location": "Berlin",
        "category": "workshop",
        "image_url": null,
        "status": status,
        "created_by": created_by,
        "created_at": "2024-12-01T08:00:00.000Z"
    })
}

/// A complete `participants` row with a generated name and email
pub fn participant_row(id: &str, event_id: &str) -> Value {
    let name: String = Name().fake();
    let email: String = SafeEmail().fake();
    json!({
        "id": id,
        "name": name,
        "email": email,
        "added_at": "2024-12-02T09:30:00.000Z",
        "added_by": "u1",
        "event_id": event_id
    })
}

/// A `profiles` row
pub fn profile_row(id: &str, role: &str, created_at: &str) -> Value {
    let email: String = SafeEmail().fake();
    json!({
        "id": id,
        "first_name": "Test",
        "last_name": id,
        "email": email,
        "role": role,
        "avatar_url": null,
        "created_at": created_at
    })
}

pub fn new_event(title: &str, created_by: &RecordId) -> NewEvent {
    let description: String = Sentence(3..8).fake();
    NewEvent::new(title, launch_date(), created_by.clone())
        .with_description(description)
        .with_location("Berlin")
}

pub fn new_participant(event_id: &RecordId, added_by: &RecordId) -> NewParticipant {
    let name: String = Name().fake();
    let email: String = SafeEmail().fake();
    NewParticipant::new(name, email, added_by.clone(), event_id.clone())
}

/// Three events in storage order, deliberately not sorted by date
pub fn three_event_rows() -> Vec<Value> {
    vec![
        event_row("e1", "Spring Gala", "2025-04-01T18:00:00Z", "approved", "u1"),
        event_row("e2", "Winter Meetup", "2025-01-15T18:00:00Z", "pending", "u2"),
        event_row("e3", "Autumn Workshop", "2025-10-01T09:00:00Z", "rejected", "u1"),
    ]
}
