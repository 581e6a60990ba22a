//! Services module
//!
//! This module contains the services layered over the backend and the
//! stores: notices, media uploads, profiles, authentication and moderation.

pub mod auth;
pub mod media;
pub mod moderation;
pub mod notification;
pub mod profile;

// Re-export commonly used services
pub use auth::{AuthListener, AuthService, AuthState, SignUpRequest};
pub use media::MediaService;
pub use moderation::ModerationService;
pub use notification::{Notice, NoticeLevel, NotificationService, NotificationStats};
pub use profile::ProfileService;

use std::sync::Arc;
use crate::backend::RemoteBackend;
use crate::config::Settings;

/// Service factory for creating and sharing the backend-facing services
#[derive(Clone)]
pub struct ServiceFactory {
    pub notification_service: NotificationService,
    pub media_service: MediaService,
    pub profile_service: ProfileService,
    pub auth_service: AuthService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(backend: Arc<dyn RemoteBackend>, settings: &Settings) -> Self {
        let notification_service = NotificationService::new(settings.feed.channel_capacity);
        let media_service = MediaService::new(Arc::clone(&backend), settings.storage.clone());
        let profile_service = ProfileService::new(
            Arc::clone(&backend),
            media_service.clone(),
            notification_service.clone(),
        );
        let auth_service = AuthService::new(backend, profile_service.clone());

        Self {
            notification_service,
            media_service,
            profile_service,
            auth_service,
        }
    }
}
