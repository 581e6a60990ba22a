//! Event store
//!
//! Mirrors the `events` table. Fetches are ordered by `date_time` ascending
//! and may be restricted to one creator. Every mutation reports its outcome
//! through the [`NotificationService`].

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};
use crate::backend::{ChangeKind, Query, RemoteBackend};
use crate::models::{Attachment, Event, EventStatus, EventUpdate, NewEvent, Record, RecordId, StatusChange};
use crate::services::media::MediaService;
use crate::services::notification::NotificationService;
use crate::utils::errors::{EventHubError, Result};
use super::collection::RemoteCollection;
use super::listener::{spawn_reconciler, SubscriptionHandle};
use super::projection::Projection;

/// Process-wide mirror of the events table
#[derive(Clone)]
pub struct EventStore {
    collection: RemoteCollection<Event>,
    media: MediaService,
    notifications: NotificationService,
}

impl EventStore {
    /// Create a new EventStore instance
    pub fn new(backend: Arc<dyn RemoteBackend>, media: MediaService, notifications: NotificationService) -> Self {
        Self {
            collection: RemoteCollection::new(backend),
            media,
            notifications,
        }
    }

    pub fn watch(&self) -> watch::Receiver<Projection<Event>> {
        self.collection.watch()
    }

    pub fn snapshot(&self) -> Projection<Event> {
        self.collection.snapshot()
    }

    pub fn events(&self) -> Vec<Event> {
        self.collection.records()
    }

    pub fn get(&self, id: &RecordId) -> Option<Event> {
        self.collection.get(id)
    }

    /// Fetch all events, or only those created by `owner`
    pub async fn fetch_events(&self, owner: Option<&RecordId>) -> Result<Vec<Event>> {
        let mut query = Query::new().order("date_time", true);
        if let Some(owner) = owner {
            query = query.eq("created_by", owner.as_str());
        }
        debug!(owner = owner.map(RecordId::as_str), "Fetching events");
        self.collection.fetch(&query).await
    }

    /// Single read for a detail view; the projection is not touched
    pub async fn fetch_event(&self, id: &RecordId) -> Result<Event> {
        let query = Query::new().eq("id", id.as_str());
        let rows = self.collection.backend().select(Event::TABLE, &query).await?;
        let row = rows.into_iter().next().ok_or_else(|| EventHubError::NotFound {
            table: Event::TABLE.to_string(),
            id: id.to_string(),
        })?;
        Event::from_row(row)
    }

    pub async fn add_event(&self, event: NewEvent) -> Result<Event> {
        event.validate()?;
        match self.collection.insert(&event).await {
            Ok(created) => {
                self.notifications.success("Event added successfully!");
                Ok(created)
            }
            Err(e) => {
                self.notifications.failure("Error adding event", &e);
                Err(e)
            }
        }
    }

    /// Upload the image first, then create the event pointing at its public URL.
    /// A failed create leaves the uploaded object behind.
    pub async fn add_event_with_image(&self, event: NewEvent, image: Attachment) -> Result<Event> {
        event.validate()?;
        let image_url = match self.media.upload_event_image(&event.created_by, &image).await {
            Ok(url) => url,
            Err(e) => {
                if !e.is_local() {
                    self.notifications.failure("Error uploading image", &e);
                }
                return Err(e);
            }
        };
        self.add_event(event.with_image_url(image_url)).await
    }

    /// General update; never changes status
    pub async fn update_event(&self, id: &RecordId, update: EventUpdate) -> Result<Event> {
        if update.is_empty() {
            return Err(EventHubError::InvalidInput("Nothing to update".to_string()));
        }
        match self.collection.update(id, &update).await {
            Ok(updated) => {
                self.notifications.success("Event updated successfully!");
                Ok(updated)
            }
            Err(e) => {
                self.notifications.failure("Error updating event", &e);
                Err(e)
            }
        }
    }

    /// Patch only the status column. Callers decide who may do this.
    pub async fn update_status(&self, id: &RecordId, status: EventStatus) -> Result<Event> {
        match self.collection.update(id, &StatusChange { status }).await {
            Ok(updated) => {
                info!(event_id = %id, status = %status, "Event status changed");
                self.notifications.success(format!("Event {}", status));
                Ok(updated)
            }
            Err(e) => {
                self.notifications.failure("Action failed", &e);
                Err(e)
            }
        }
    }

    pub async fn delete_event(&self, id: &RecordId) -> Result<()> {
        match self.collection.delete(id).await {
            Ok(()) => {
                self.notifications.success("Event deleted successfully");
                Ok(())
            }
            Err(e) => {
                self.notifications.failure("Error deleting event", &e);
                Err(e)
            }
        }
    }

    /// Follow every change to the events table until the handle is unsubscribed
    pub async fn subscribe_to_events(&self) -> Result<SubscriptionHandle> {
        let feed = self.collection.backend().subscribe(Event::TABLE).await?;
        let notifications = self.notifications.clone();
        let handle = spawn_reconciler(self.collection.clone(), feed, move |change| {
            if change.kind == ChangeKind::Insert {
                notifications.info("New event added");
            }
        });
        info!("Subscribed to event changes");
        Ok(handle)
    }
}
