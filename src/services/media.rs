//! Media service implementation
//!
//! Uploads event images and avatars to object storage and hands back the
//! public URL that entity rows store instead of the bytes.

use std::sync::Arc;
use chrono::Utc;
use tracing::{debug, info};
use crate::backend::RemoteBackend;
use crate::config::StorageConfig;
use crate::models::{Attachment, RecordId};
use crate::utils::errors::Result;
use crate::utils::helpers::object_name;

#[derive(Clone)]
pub struct MediaService {
    backend: Arc<dyn RemoteBackend>,
    storage: StorageConfig,
}

impl MediaService {
    /// Create a new MediaService instance
    pub fn new(backend: Arc<dyn RemoteBackend>, storage: StorageConfig) -> Self {
        Self { backend, storage }
    }

    /// Upload `file` under `{account}-{unix_millis}-{file name}` and return its public URL
    ///
    /// Empty selections are rejected before anything is sent.
    pub async fn upload(&self, bucket: &str, account_id: &RecordId, file: &Attachment, upsert: bool) -> Result<String> {
        file.validate()?;
        let path = object_name(account_id.as_str(), Utc::now().timestamp_millis(), &file.file_name);
        debug!(bucket = bucket, path = %path, size = file.bytes.len(), "Uploading object");

        self.backend.upload(bucket, &path, file, upsert).await?;
        let url = self.backend.public_url(bucket, &path)?;

        info!(bucket = bucket, path = %path, "Object uploaded");
        Ok(url)
    }

    pub async fn upload_event_image(&self, account_id: &RecordId, file: &Attachment) -> Result<String> {
        self.upload(&self.storage.event_images_bucket, account_id, file, false).await
    }

    /// Avatars overwrite an existing object of the same name
    pub async fn upload_avatar(&self, account_id: &RecordId, file: &Attachment) -> Result<String> {
        self.upload(&self.storage.avatars_bucket, account_id, file, true).await
    }
}
