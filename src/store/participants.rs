//! Participant store
//!
//! Mirrors the participants of one event at a time: a fetch replaces the
//! projection with the registrants of the requested event, in the order the
//! backend returns them.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;
use crate::backend::{Query, RemoteBackend};
use crate::models::{NewParticipant, Participant, RecordId};
use crate::services::notification::NotificationService;
use crate::utils::errors::Result;
use super::collection::RemoteCollection;
use super::projection::Projection;

#[derive(Clone)]
pub struct ParticipantStore {
    collection: RemoteCollection<Participant>,
    notifications: NotificationService,
}

impl ParticipantStore {
    pub fn new(backend: Arc<dyn RemoteBackend>, notifications: NotificationService) -> Self {
        Self {
            collection: RemoteCollection::new(backend),
            notifications,
        }
    }

    pub fn watch(&self) -> watch::Receiver<Projection<Participant>> {
        self.collection.watch()
    }

    pub fn snapshot(&self) -> Projection<Participant> {
        self.collection.snapshot()
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.collection.records()
    }

    pub async fn fetch_participants(&self, event_id: &RecordId) -> Result<Vec<Participant>> {
        debug!(event_id = %event_id, "Fetching participants");
        self.collection
            .fetch(&Query::new().eq("event_id", event_id.as_str()))
            .await
    }

    pub async fn add_participant(&self, participant: NewParticipant) -> Result<Participant> {
        participant.validate()?;
        match self.collection.insert(&participant).await {
            Ok(created) => {
                self.notifications.success("Participant added successfully!");
                Ok(created)
            }
            Err(e) => {
                self.notifications.failure("Error adding participant", &e);
                Err(e)
            }
        }
    }

    pub async fn delete_participant(&self, id: &RecordId) -> Result<()> {
        match self.collection.delete(id).await {
            Ok(()) => {
                self.notifications.success("Participant deleted successfully!");
                Ok(())
            }
            Err(e) => {
                self.notifications.failure("Error deleting participant", &e);
                Err(e)
            }
        }
    }
}
