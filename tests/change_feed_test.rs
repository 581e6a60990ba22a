//! Change feed subscription scenarios
//!
//! Writes made by "another client" are simulated with
//! `InMemoryBackend::emit`, which publishes a notification without touching
//! the tables.

mod helpers;

use assert_matches::assert_matches;
use serde_json::json;
use eventhub::backend::{Operation, RowChange};
use eventhub::models::{EventStatus, RecordId};
use eventhub::services::NoticeLevel;
use eventhub::EventHubError;
use helpers::*;

#[tokio::test]
async fn test_remote_writes_are_reconciled() {
    let ctx = TestContext::new();
    let events = ctx.app.events();
    let handle = events.subscribe_to_events().await.unwrap();
    assert_eq!(handle.table(), "events");
    assert!(handle.is_active());

    let row = event_row("r1", "Remote Party", "2025-05-05T18:00:00Z", "pending", "u9");
    ctx.backend.emit(RowChange::insert("events", row.clone()));
    assert!(eventually(|| events.get(&RecordId::new("r1")).is_some()).await);

    let mut approved = row.clone();
    approved["status"] = json!("approved");
    ctx.backend.emit(RowChange::update("events", approved, Some(row.clone())));
    assert!(
        eventually(|| events.get(&RecordId::new("r1")).map(|e| e.status) == Some(EventStatus::Approved)).await
    );

    ctx.backend.emit(RowChange::delete("events", json!({"id": "r1"})));
    assert!(eventually(|| events.snapshot().is_empty()).await);

    handle.unsubscribe().await.unwrap();
}

#[tokio::test]
async fn test_update_for_unknown_record_is_added() {
    let ctx = TestContext::new();
    let events = ctx.app.events();
    let handle = events.subscribe_to_events().await.unwrap();

    let row = event_row("r2", "Late Arrival", "2025-06-01T09:00:00Z", "approved", "u9");
    ctx.backend.emit(RowChange::update("events", row, None));

    assert!(eventually(|| events.get(&RecordId::new("r2")).is_some()).await);
    handle.unsubscribe().await.unwrap();
}

#[tokio::test]
async fn test_insert_for_existing_record_is_ignored() {
    let ctx = TestContext::new();
    ctx.backend.seed("events", three_event_rows()).await;
    let events = ctx.app.events();
    events.fetch_events(None).await.unwrap();
    let handle = events.subscribe_to_events().await.unwrap();

    let stale = event_row("e1", "Stale Copy", "2025-04-10T19:00:00Z", "pending", "u1");
    ctx.backend.emit(RowChange::insert("events", stale));
    // A later notification proves the stale one was processed first
    ctx.backend.emit(RowChange::insert(
        "events",
        event_row("r3", "Marker", "2025-08-08T08:00:00Z", "pending", "u9"),
    ));
    assert!(eventually(|| events.get(&RecordId::new("r3")).is_some()).await);

    let kept = events.get(&RecordId::new("e1")).unwrap();
    assert_eq!(kept.title, "Spring Gala");
    assert_eq!(kept.status, EventStatus::Approved);
    assert_eq!(events.snapshot().len(), 4);
    handle.unsubscribe().await.unwrap();
}

#[tokio::test]
async fn test_undecodable_notification_is_skipped() {
    let ctx = TestContext::new();
    let events = ctx.app.events();
    let handle = events.subscribe_to_events().await.unwrap();

    ctx.backend.emit(RowChange::insert("events", json!({"id": "broken", "title": 42})));
    ctx.backend.emit(RowChange::insert(
        "events",
        event_row("r4", "After Broken", "2025-02-02T20:00:00Z", "pending", "u9"),
    ));

    assert!(eventually(|| events.get(&RecordId::new("r4")).is_some()).await);
    assert!(events.get(&RecordId::new("broken")).is_none());
    assert!(handle.is_active());
    handle.unsubscribe().await.unwrap();
}

#[tokio::test]
async fn test_other_tables_do_not_reach_event_projection() {
    let ctx = TestContext::new();
    let events = ctx.app.events();
    let handle = events.subscribe_to_events().await.unwrap();

    ctx.backend.emit(RowChange::insert("participants", participant_row("p1", "E1")));
    ctx.backend.emit(RowChange::insert(
        "events",
        event_row("r5", "Only Event", "2025-02-02T20:00:00Z", "pending", "u9"),
    ));

    assert!(eventually(|| events.get(&RecordId::new("r5")).is_some()).await);
    assert_eq!(events.snapshot().len(), 1);
    handle.unsubscribe().await.unwrap();
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let ctx = TestContext::new();
    let events = ctx.app.events();
    let handle = events.subscribe_to_events().await.unwrap();
    assert_eq!(ctx.backend.active_feeds(), 1);

    handle.unsubscribe().await.unwrap();
    assert!(!handle.is_active());
    assert_matches!(handle.ensure_active(), Err(EventHubError::FeedClosed));
    assert!(eventually(|| ctx.backend.active_feeds() == 0).await);

    ctx.backend.emit(RowChange::insert(
        "events",
        event_row("r6", "Too Late", "2025-02-02T20:00:00Z", "pending", "u9"),
    ));
    settle().await;
    assert!(events.snapshot().is_empty());
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent() {
    let ctx = TestContext::new();
    let handle = ctx.app.events().subscribe_to_events().await.unwrap();
    let clone = handle.clone();

    handle.unsubscribe().await.unwrap();
    handle.unsubscribe().await.unwrap();
    clone.unsubscribe().await.unwrap();
    assert!(!clone.is_active());
}

#[tokio::test]
async fn test_dropping_every_handle_stops_reconciler() {
    let ctx = TestContext::new();
    let handle = ctx.app.events().subscribe_to_events().await.unwrap();
    assert_eq!(ctx.backend.active_feeds(), 1);

    drop(handle);

    assert!(eventually(|| ctx.backend.active_feeds() == 0).await);
}

#[tokio::test]
async fn test_remote_insert_publishes_info_notice() {
    let ctx = TestContext::new();
    let events = ctx.app.events();
    let mut notices = ctx.app.notifications().subscribe();
    let handle = events.subscribe_to_events().await.unwrap();

    ctx.backend.emit(RowChange::insert(
        "events",
        event_row("r7", "Announced", "2025-02-02T20:00:00Z", "pending", "u9"),
    ));

    let notice = tokio::time::timeout(std::time::Duration::from_secs(2), notices.recv())
        .await
        .expect("notice in time")
        .unwrap();
    assert_eq!(notice.level, NoticeLevel::Info);
    assert_eq!(notice.message, "New event added");
    handle.unsubscribe().await.unwrap();
}

#[tokio::test]
async fn test_subscribe_failure_is_reported() {
    let ctx = TestContext::new();
    ctx.backend.fail_next(Operation::Subscribe, "realtime unavailable").await;

    let err = ctx.app.events().subscribe_to_events().await.unwrap_err();

    assert_matches!(err, EventHubError::Remote { .. });
    assert_eq!(ctx.backend.active_feeds(), 0);
}
