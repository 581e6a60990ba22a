//! Binary attachment payloads (event images, avatars)

use crate::utils::errors::{EventHubError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Extension of the original file name, lowercased
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }

    /// Content type sent with the upload: the explicit one, else a guess from the extension
    pub fn mime_type(&self) -> String {
        if let Some(content_type) = &self.content_type {
            return content_type.clone();
        }
        let guessed = match self.extension().as_deref() {
            Some("png") => "image/png",
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("svg") => "image/svg+xml",
            Some("pdf") => "application/pdf",
            _ => "application/octet-stream",
        };
        guessed.to_string()
    }

    /// An empty selection is rejected locally, before any upload
    pub fn validate(&self) -> Result<()> {
        if self.file_name.trim().is_empty() {
            return Err(EventHubError::InvalidInput("No file selected.".to_string()));
        }
        if self.bytes.is_empty() {
            return Err(EventHubError::InvalidInput(format!("File {} is empty", self.file_name)));
        }
        Ok(())
    }
}
