//! Participant store scenarios over the in-memory backend

mod helpers;

use assert_matches::assert_matches;
use eventhub::backend::Operation;
use eventhub::models::{NewParticipant, RecordId};
use eventhub::EventHubError;
use helpers::*;

#[tokio::test]
async fn test_fetch_is_scoped_to_one_event() {
    let ctx = TestContext::new();
    ctx.backend
        .seed(
            "participants",
            vec![
                participant_row("p1", "E1"),
                participant_row("p2", "E2"),
                participant_row("p3", "E1"),
                participant_row("p4", "E3"),
            ],
        )
        .await;
    let participants = ctx.app.participants();

    let fetched = participants.fetch_participants(&RecordId::new("E1")).await.unwrap();

    assert_eq!(fetched.len(), 2);
    assert!(fetched.iter().all(|p| p.event_id == RecordId::new("E1")));
    let snapshot = participants.snapshot();
    let ids: Vec<&str> = snapshot.records().iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p3"]);
}

#[tokio::test]
async fn test_switching_events_replaces_projection() {
    let ctx = TestContext::new();
    ctx.backend
        .seed("participants", vec![participant_row("p1", "E1"), participant_row("p2", "E2")])
        .await;
    let participants = ctx.app.participants();

    participants.fetch_participants(&RecordId::new("E1")).await.unwrap();
    participants.fetch_participants(&RecordId::new("E2")).await.unwrap();

    let snapshot = participants.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.records()[0].id, RecordId::new("p2"));
}

#[tokio::test]
async fn test_add_and_delete_participant() {
    let ctx = TestContext::new();
    let participants = ctx.app.participants();
    let event_id = RecordId::new("E1");

    let added = participants
        .add_participant(new_participant(&event_id, &RecordId::new("u1")))
        .await
        .unwrap();
    assert_eq!(added.event_id, event_id);
    assert_eq!(participants.participants(), vec![added.clone()]);

    participants.delete_participant(&added.id).await.unwrap();
    assert!(participants.snapshot().is_empty());
    assert!(ctx.backend.rows("participants").await.is_empty());
}

#[tokio::test]
async fn test_server_fills_added_at() {
    let ctx = TestContext::new();
    let participants = ctx.app.participants();

    let added = participants
        .add_participant(NewParticipant::new("Ada", "ada@example.com", "u1".into(), "E1".into()))
        .await
        .unwrap();

    let stored = ctx.backend.rows("participants").await;
    assert_eq!(stored.len(), 1);
    assert!(stored[0].get("added_at").and_then(|v| v.as_str()).is_some());
    assert_eq!(added.name, "Ada");
}

#[tokio::test]
async fn test_invalid_participant_rejected_before_remote_call() {
    let ctx = TestContext::new();
    let participants = ctx.app.participants();

    let err = participants
        .add_participant(NewParticipant::new("Ada", "not-an-email", "u1".into(), "E1".into()))
        .await
        .unwrap_err();

    assert_matches!(err, EventHubError::InvalidInput(_));
    assert!(ctx.backend.rows("participants").await.is_empty());
    assert_eq!(participants.snapshot().error(), None);
}

#[tokio::test]
async fn test_failed_delete_keeps_participant() {
    let ctx = TestContext::new();
    ctx.backend.seed("participants", vec![participant_row("p1", "E1")]).await;
    let participants = ctx.app.participants();
    participants.fetch_participants(&RecordId::new("E1")).await.unwrap();
    let mut notices = ctx.app.notifications().subscribe();

    ctx.backend.fail_next(Operation::Delete, "permission denied").await;
    let result = participants.delete_participant(&RecordId::new("p1")).await;

    assert!(result.is_err());
    assert_eq!(participants.snapshot().len(), 1);
    assert_eq!(participants.snapshot().error(), Some("permission denied"));
    assert_eq!(
        notices.recv().await.unwrap().message,
        "Error deleting participant: permission denied"
    );
}
