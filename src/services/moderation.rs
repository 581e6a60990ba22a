//! Moderation service implementation
//!
//! The UI-policy gate in front of [`EventStore::update_status`]: only a
//! signed-in administrator may approve or reject events through it. The
//! store itself trusts its caller, and the backend's access rules remain
//! the real enforcement.

use crate::models::{Event, EventStatus, RecordId};
use crate::store::EventStore;
use crate::utils::errors::Result;
use crate::utils::logging::log_admin_action;
use super::auth::AuthService;

#[derive(Clone)]
pub struct ModerationService {
    auth: AuthService,
    events: EventStore,
}

impl ModerationService {
    /// Create a new ModerationService instance
    pub fn new(auth: AuthService, events: EventStore) -> Self {
        Self { auth, events }
    }

    pub async fn approve(&self, event_id: &RecordId) -> Result<Event> {
        self.set_status(event_id, EventStatus::Approved).await
    }

    pub async fn reject(&self, event_id: &RecordId) -> Result<Event> {
        self.set_status(event_id, EventStatus::Rejected).await
    }

    /// Change an event's status on behalf of the signed-in administrator
    pub async fn set_status(&self, event_id: &RecordId, status: EventStatus) -> Result<Event> {
        let admin = self.auth.require_admin()?;
        let event = self.events.update_status(event_id, status).await?;
        log_admin_action(
            admin.id.as_str(),
            "set_event_status",
            Some(event_id.as_str()),
            Some(status.as_str()),
        );
        Ok(event)
    }
}
