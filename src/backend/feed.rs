//! Row-level change feed
//!
//! A feed is a bounded channel of [`RowChange`] notifications for one table.
//! The producing side ([`FeedPublisher`]) lives in a backend task; the
//! consuming side ([`ChangeFeed`]) is handed to whoever subscribed. Teardown
//! is explicit: [`ChangeFeed::unsubscribe`] stops delivery for good and
//! signals the producer to exit.

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use futures::Stream;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use crate::models::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Insert => f.write_str("INSERT"),
            ChangeKind::Update => f.write_str("UPDATE"),
            ChangeKind::Delete => f.write_str("DELETE"),
        }
    }
}

/// One server-pushed notification
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    pub kind: ChangeKind,
    pub table: String,
    pub new_row: Option<Value>,
    pub old_row: Option<Value>,
}

impl RowChange {
    pub fn insert(table: impl Into<String>, row: Value) -> Self {
        Self { kind: ChangeKind::Insert, table: table.into(), new_row: Some(row), old_row: None }
    }

    pub fn update(table: impl Into<String>, new_row: Value, old_row: Option<Value>) -> Self {
        Self { kind: ChangeKind::Update, table: table.into(), new_row: Some(new_row), old_row }
    }

    pub fn delete(table: impl Into<String>, old_row: Value) -> Self {
        Self { kind: ChangeKind::Delete, table: table.into(), new_row: None, old_row: Some(old_row) }
    }

    /// Id of the affected row, taken from the new row when present
    pub fn record_id(&self) -> Option<RecordId> {
        self.new_row
            .as_ref()
            .and_then(RecordId::from_row)
            .or_else(|| self.old_row.as_ref().and_then(RecordId::from_row))
    }
}

/// Consuming end of a change feed
pub struct ChangeFeed {
    table: String,
    rx: mpsc::Receiver<RowChange>,
    shutdown_tx: watch::Sender<bool>,
    closed: bool,
}

/// Producing end of a change feed
pub struct FeedPublisher {
    tx: mpsc::Sender<RowChange>,
    shutdown_rx: watch::Receiver<bool>,
}

impl ChangeFeed {
    /// Create a connected publisher/feed pair
    pub fn channel(table: impl Into<String>, capacity: usize) -> (FeedPublisher, ChangeFeed) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let publisher = FeedPublisher { tx, shutdown_rx };
        let feed = ChangeFeed { table: table.into(), rx, shutdown_tx, closed: false };
        (publisher, feed)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Next notification; `None` once unsubscribed or the producer is gone
    pub async fn recv(&mut self) -> Option<RowChange> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    /// Stop delivery and release the upstream subscription. Idempotent.
    pub fn unsubscribe(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.shutdown_tx.send(true);
        self.rx.close();
        tracing::debug!(table = %self.table, "Change feed unsubscribed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Stream for ChangeFeed {
    type Item = RowChange;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<RowChange>> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(None);
        }
        this.rx.poll_recv(cx)
    }
}

impl fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("table", &self.table)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl FeedPublisher {
    /// Deliver one notification. Returns `false` once the consumer is gone.
    pub async fn publish(&self, change: RowChange) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.tx.send(change).await.is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shutdown_rx.borrow() || self.tx.is_closed()
    }

    /// Resolves when the consumer unsubscribes or drops the feed
    pub async fn cancelled(&mut self) {
        loop {
            if *self.shutdown_rx.borrow_and_update() {
                return;
            }
            if self.shutdown_rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Index rows by id, skipping rows without one
pub fn index_rows(rows: &[Value]) -> HashMap<RecordId, Value> {
    rows.iter()
        .filter_map(|row| RecordId::from_row(row).map(|id| (id, row.clone())))
        .collect()
}

/// Derive notifications from two consecutive snapshots of a table
///
/// Inserts and updates follow the order of `current`; deletes follow at the end.
pub fn diff_snapshots(
    table: &str,
    previous: &HashMap<RecordId, Value>,
    current: &[Value],
) -> Vec<RowChange> {
    let mut changes = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for row in current {
        let Some(id) = RecordId::from_row(row) else {
            continue;
        };
        match previous.get(&id) {
            None => changes.push(RowChange::insert(table, row.clone())),
            Some(old) if old != row => {
                changes.push(RowChange::update(table, row.clone(), Some(old.clone())))
            }
            Some(_) => {}
        }
        seen.insert(id);
    }

    let mut removed: Vec<(&RecordId, &Value)> = previous
        .iter()
        .filter(|(id, _)| !seen.contains(*id))
        .collect();
    removed.sort_by(|a, b| a.0.cmp(b.0));
    changes.extend(removed.into_iter().map(|(_, old)| RowChange::delete(table, old.clone())));

    changes
}
