//! Remote-collection mirror
//!
//! [`RemoteCollection`] pairs a [`Projection`] with the backend table it
//! mirrors. Fetches replace the projection wholesale; each mutation sends
//! exactly one remote write and reconciles only the affected record. A
//! failed call leaves the records untouched and records the failure message.
//! Every projection change is published on a `watch` channel.

use std::sync::Arc;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};
use crate::backend::{ChangeKind, Query, RemoteBackend, RowChange};
use crate::models::{Record, RecordId};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::{log_feed_notification, log_store_operation};
use super::projection::{Projection, UpsertOutcome};

pub struct RemoteCollection<T: Record> {
    backend: Arc<dyn RemoteBackend>,
    state: Arc<watch::Sender<Projection<T>>>,
}

impl<T: Record> Clone for RemoteCollection<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Record> RemoteCollection<T> {
    pub fn new(backend: Arc<dyn RemoteBackend>) -> Self {
        let (state, _) = watch::channel(Projection::default());
        Self {
            backend,
            state: Arc::new(state),
        }
    }

    pub fn table(&self) -> &'static str {
        T::TABLE
    }

    pub fn backend(&self) -> &Arc<dyn RemoteBackend> {
        &self.backend
    }

    /// Receiver notified on every projection change
    pub fn watch(&self) -> watch::Receiver<Projection<T>> {
        self.state.subscribe()
    }

    /// Copy of the current projection
    pub fn snapshot(&self) -> Projection<T> {
        self.state.borrow().clone()
    }

    pub fn records(&self) -> Vec<T> {
        self.state.borrow().records().to_vec()
    }

    pub fn get(&self, id: &RecordId) -> Option<T> {
        self.state.borrow().get(id).cloned()
    }

    fn begin(&self) {
        self.state.send_modify(Projection::begin);
    }

    fn fail(&self, operation: &str, id: Option<&RecordId>, err: &EventHubError) {
        log_store_operation(T::TABLE, operation, id.map(RecordId::as_str), false);
        let message = err.to_string();
        self.state.send_modify(|p| p.fail(message));
    }

    async fn select_records(&self, query: &Query) -> Result<Vec<T>> {
        let rows = self.backend.select(T::TABLE, query).await?;
        rows.into_iter().map(T::from_row).collect()
    }

    async fn insert_record<P: Serialize + ?Sized>(&self, payload: &P) -> Result<T> {
        let row = serde_json::to_value(payload)?;
        let created = self.backend.insert(T::TABLE, row).await?;
        T::from_row(created)
    }

    async fn update_record<P: Serialize + ?Sized>(&self, id: &RecordId, patch: &P) -> Result<T> {
        let patch = serde_json::to_value(patch)?;
        let updated = self.backend.update(T::TABLE, id, patch).await?;
        T::from_row(updated)
    }

    /// Pull a server-filtered, server-sorted snapshot and replace the projection
    pub async fn fetch(&self, query: &Query) -> Result<Vec<T>> {
        debug!(table = T::TABLE, filters = query.filters.len(), "Fetching snapshot");
        self.begin();

        match self.select_records(query).await {
            Ok(records) => {
                let snapshot = records.clone();
                self.state.send_modify(|p| {
                    p.replace(snapshot);
                    p.settle();
                });
                log_store_operation(T::TABLE, "fetch", None, true);
                Ok(records)
            }
            Err(e) => {
                self.fail("fetch", None, &e);
                Err(e)
            }
        }
    }

    /// Insert one row and upsert the server's representation of it
    pub async fn insert<P: Serialize + ?Sized>(&self, payload: &P) -> Result<T> {
        self.begin();

        match self.insert_record(payload).await {
            Ok(record) => {
                let stored = record.clone();
                self.state.send_modify(|p| {
                    p.upsert(stored);
                    p.settle();
                });
                log_store_operation(T::TABLE, "insert", Some(record.id().as_str()), true);
                info!(table = T::TABLE, record_id = %record.id(), "Record created");
                Ok(record)
            }
            Err(e) => {
                self.fail("insert", None, &e);
                Err(e)
            }
        }
    }

    /// Patch one row by id and upsert the returned value
    pub async fn update<P: Serialize + ?Sized>(&self, id: &RecordId, patch: &P) -> Result<T> {
        self.begin();

        match self.update_record(id, patch).await {
            Ok(record) => {
                let stored = record.clone();
                self.state.send_modify(|p| {
                    p.upsert(stored);
                    p.settle();
                });
                log_store_operation(T::TABLE, "update", Some(id.as_str()), true);
                info!(table = T::TABLE, record_id = %id, "Record updated");
                Ok(record)
            }
            Err(e) => {
                self.fail("update", Some(id), &e);
                Err(e)
            }
        }
    }

    /// Delete one row by id and drop it from the projection
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        self.begin();

        match self.backend.delete(T::TABLE, id).await {
            Ok(()) => {
                self.state.send_modify(|p| {
                    p.remove(id);
                    p.settle();
                });
                log_store_operation(T::TABLE, "delete", Some(id.as_str()), true);
                info!(table = T::TABLE, record_id = %id, "Record deleted");
                Ok(())
            }
            Err(e) => {
                self.fail("delete", Some(id), &e);
                Err(e)
            }
        }
    }

    /// Apply one change feed notification
    ///
    /// Inserts only add records not already present, updates replace by id
    /// and deletes remove by id. Returns whether the projection changed.
    pub fn apply_change(&self, change: &RowChange) -> Result<bool> {
        let applied = match change.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let row = change
                    .new_row
                    .clone()
                    .ok_or_else(|| EventHubError::remote(format!("{} notification without a row", change.kind)))?;
                let record = T::from_row(row)?;
                let id = record.id().clone();
                let insert_only = change.kind == ChangeKind::Insert;

                let changed = self.state.send_if_modified(|p| {
                    if insert_only {
                        p.insert_if_absent(record)
                    } else {
                        p.upsert(record) != UpsertOutcome::Unchanged
                    }
                });
                log_feed_notification(T::TABLE, &change.kind.to_string(), id.as_str(), changed);
                changed
            }
            ChangeKind::Delete => {
                let id = change
                    .old_row
                    .as_ref()
                    .and_then(RecordId::from_row)
                    .ok_or_else(|| EventHubError::remote("DELETE notification without an id"))?;

                let changed = self.state.send_if_modified(|p| p.remove(&id).is_some());
                log_feed_notification(T::TABLE, &change.kind.to_string(), id.as_str(), changed);
                changed
            }
        };
        Ok(applied)
    }
}
