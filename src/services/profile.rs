//! Profile service implementation
//!
//! Reads and writes rows of the `profiles` table: the signup upsert, profile
//! edits with an optional avatar and the member listing for administrators.

use std::sync::Arc;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use crate::backend::{Query, RemoteBackend};
use crate::models::{Attachment, Profile, ProfileEdit, ProfileUpsert, Record, RecordId, Role};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::is_valid_email;
use super::media::MediaService;
use super::notification::NotificationService;

/// Profile service for account profile operations
#[derive(Clone)]
pub struct ProfileService {
    backend: Arc<dyn RemoteBackend>,
    media: MediaService,
    notifications: NotificationService,
}

impl ProfileService {
    /// Create a new ProfileService instance
    pub fn new(backend: Arc<dyn RemoteBackend>, media: MediaService, notifications: NotificationService) -> Self {
        Self {
            backend,
            media,
            notifications,
        }
    }

    /// Get the profile sharing `id` with an auth identity, if one exists
    pub async fn fetch_profile(&self, id: &RecordId) -> Result<Option<Profile>> {
        debug!(profile_id = %id, "Fetching profile");
        let rows = self
            .backend
            .select(Profile::TABLE, &Query::new().eq("id", id.as_str()))
            .await?;
        rows.into_iter().next().map(Profile::from_row).transpose()
    }

    /// Insert or merge a profile row by id
    pub async fn upsert_profile(&self, profile: ProfileUpsert) -> Result<Profile> {
        let row = serde_json::to_value(&profile)?;
        let stored = Profile::from_row(self.backend.upsert(Profile::TABLE, row).await?)?;
        info!(profile_id = %stored.id, role = %stored.role, "Profile upserted");
        Ok(stored)
    }

    /// Save edited fields, uploading a new avatar first when one is given.
    /// The role is carried over from `current` unchanged.
    pub async fn update_profile(
        &self,
        current: &Profile,
        edit: ProfileEdit,
        avatar: Option<&Attachment>,
    ) -> Result<Profile> {
        if !edit.email.trim().is_empty() && !is_valid_email(&edit.email) {
            return Err(EventHubError::InvalidInput(format!("Invalid email address: {}", edit.email)));
        }

        let result = self.save_edit(current, edit, avatar).await;

        match result {
            Ok(profile) => {
                self.notifications.success("Profile updated successfully!");
                Ok(profile)
            }
            Err(e) => {
                self.notifications.failure("Failed to update profile", &e);
                Err(e)
            }
        }
    }

    async fn save_edit(&self, current: &Profile, edit: ProfileEdit, avatar: Option<&Attachment>) -> Result<Profile> {
        let avatar_url = match avatar {
            Some(file) => Some(self.media.upload_avatar(&current.id, file).await?),
            None => current.avatar_url.clone(),
        };
        self.upsert_profile(ProfileUpsert {
            id: current.id.clone(),
            first_name: edit.first_name.trim().to_string(),
            last_name: edit.last_name.trim().to_string(),
            email: edit.email.trim().to_string(),
            role: current.role,
            avatar_url,
            updated_at: Some(Utc::now()),
        })
        .await
    }

    /// Replace the avatar and point the profile row at it
    pub async fn upload_avatar(&self, id: &RecordId, file: &Attachment) -> Result<Profile> {
        let url = self.media.upload_avatar(id, file).await?;
        let row = self
            .backend
            .update(Profile::TABLE, id, json!({ "avatar_url": url }))
            .await?;
        info!(profile_id = %id, "Avatar updated");
        Profile::from_row(row)
    }

    /// Non-admin accounts, newest first
    pub async fn list_members(&self) -> Result<Vec<Profile>> {
        let query = Query::new()
            .neq("role", Role::Admin.to_string())
            .order("created_at", false);
        let rows = self.backend.select(Profile::TABLE, &query).await?;
        rows.into_iter().map(Profile::from_row).collect()
    }
}
