//! Change feed reconciler
//!
//! A dedicated task consumes a table's [`ChangeFeed`] and applies each
//! notification to a [`RemoteCollection`]. The task runs until its
//! [`SubscriptionHandle`] is unsubscribed (or every clone of it is dropped),
//! or until the backend closes the feed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::backend::{ChangeFeed, RowChange};
use crate::models::Record;
use crate::utils::errors::{EventHubError, Result};
use super::collection::RemoteCollection;

/// Teardown handle of a running reconciler
#[derive(Clone, Debug)]
pub struct SubscriptionHandle {
    table: &'static str,
    shutdown_tx: Arc<watch::Sender<bool>>,
    active: Arc<AtomicBool>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SubscriptionHandle {
    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Whether notifications are still being applied
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Fails with [`EventHubError::FeedClosed`] once the reconciler has stopped
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(EventHubError::FeedClosed)
        }
    }

    /// Stop the reconciler and release the feed. Safe to call more than once.
    pub async fn unsubscribe(&self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);

        let task = self.task.lock().await.take();
        match task {
            Some(join_handle) => {
                join_handle.await.map_err(|e| {
                    EventHubError::ServiceUnavailable(format!("Change feed task for {} failed: {}", self.table, e))
                })?;
                info!(table = self.table, "Unsubscribed from change feed");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

/// Spawn the reconciler for `feed`, calling `on_applied` after every
/// notification that changed the projection
pub(crate) fn spawn_reconciler<T, F>(
    collection: RemoteCollection<T>,
    feed: ChangeFeed,
    on_applied: F,
) -> SubscriptionHandle
where
    T: Record,
    F: Fn(&RowChange) + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let active = Arc::new(AtomicBool::new(true));
    let task = tokio::spawn(reconcile(collection, feed, shutdown_rx, Arc::clone(&active), on_applied));

    SubscriptionHandle {
        table: T::TABLE,
        shutdown_tx: Arc::new(shutdown_tx),
        active,
        task: Arc::new(Mutex::new(Some(task))),
    }
}

async fn reconcile<T, F>(
    collection: RemoteCollection<T>,
    mut feed: ChangeFeed,
    mut shutdown_rx: watch::Receiver<bool>,
    active: Arc<AtomicBool>,
    on_applied: F,
) where
    T: Record,
    F: Fn(&RowChange) + Send + 'static,
{
    debug!(table = T::TABLE, "Change feed reconciler started");

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            next = feed.recv() => {
                let Some(change) = next else {
                    warn!(table = T::TABLE, "Change feed closed by the backend");
                    break;
                };
                match collection.apply_change(&change) {
                    Ok(true) => on_applied(&change),
                    Ok(false) => {}
                    Err(e) => {
                        warn!(
                            table = T::TABLE,
                            kind = %change.kind,
                            error = %e,
                            "Skipping change notification that could not be applied"
                        );
                    }
                }
            }
        }
    }

    feed.unsubscribe();
    active.store(false, Ordering::Release);
    debug!(table = T::TABLE, "Change feed reconciler stopped");
}
