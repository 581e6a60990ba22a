//! Application context
//!
//! One [`AppContext`] is built per process (or per test) and handed to every
//! consumer. It owns the single event store, the single participant store
//! and the services; clones share all of them.

use std::sync::Arc;
use tracing::info;
use crate::backend::{RemoteBackend, RestBackend};
use crate::config::Settings;
use crate::services::{
    AuthService, MediaService, ModerationService, NotificationService, ProfileService, ServiceFactory,
};
use crate::store::{EventStore, ParticipantStore};
use crate::utils::errors::Result;

#[derive(Clone)]
pub struct AppContext {
    settings: Settings,
    backend: Arc<dyn RemoteBackend>,
    services: ServiceFactory,
    events: EventStore,
    participants: ParticipantStore,
    moderation: ModerationService,
}

impl AppContext {
    /// Wire stores and services over an existing backend
    pub fn new(settings: Settings, backend: Arc<dyn RemoteBackend>) -> Self {
        let services = ServiceFactory::new(Arc::clone(&backend), &settings);
        let events = EventStore::new(
            Arc::clone(&backend),
            services.media_service.clone(),
            services.notification_service.clone(),
        );
        let participants = ParticipantStore::new(Arc::clone(&backend), services.notification_service.clone());
        let moderation = ModerationService::new(services.auth_service.clone(), events.clone());

        Self {
            settings,
            backend,
            services,
            events,
            participants,
            moderation,
        }
    }

    /// Validate settings and connect to the configured hosted backend
    pub fn connect(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let backend = RestBackend::new(&settings.backend, &settings.feed)?;
        info!(url = %settings.backend.url, "Connected to backend");
        Ok(Self::new(settings, Arc::new(backend)))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn backend(&self) -> &Arc<dyn RemoteBackend> {
        &self.backend
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn participants(&self) -> &ParticipantStore {
        &self.participants
    }

    pub fn auth(&self) -> &AuthService {
        &self.services.auth_service
    }

    pub fn profiles(&self) -> &ProfileService {
        &self.services.profile_service
    }

    pub fn media(&self) -> &MediaService {
        &self.services.media_service
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.services.notification_service
    }

    pub fn moderation(&self) -> &ModerationService {
        &self.moderation
    }
}
