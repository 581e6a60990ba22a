//! Notification service implementation
//!
//! Stores and services report the outcome of every user-initiated operation
//! as a [`Notice`]. Presentation layers subscribe and render them as toasts;
//! nothing is lost for the process if nobody listens.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use crate::utils::errors::EventHubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Success => write!(f, "success"),
            NoticeLevel::Error => write!(f, "error"),
            NoticeLevel::Info => write!(f, "info"),
        }
    }
}

/// One user-facing outcome message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Notification statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total_success: u64,
    pub total_error: u64,
    pub total_info: u64,
}

#[derive(Default)]
struct Counters {
    success: AtomicU64,
    error: AtomicU64,
    info: AtomicU64,
}

/// Notification service fanning notices out to every subscriber
#[derive(Clone)]
pub struct NotificationService {
    sender: broadcast::Sender<Notice>,
    counters: Arc<Counters>,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    /// Publish a notice to current subscribers
    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let counter = match level {
            NoticeLevel::Success => &self.counters.success,
            NoticeLevel::Error => &self.counters.error,
            NoticeLevel::Info => &self.counters.info,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let notice = Notice { level, message: message.into() };
        debug!(level = %notice.level, message = %notice.message, "Publishing notice");
        let _ = self.sender.send(notice);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Success, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Info, message);
    }

    /// Failure notice of the form `"{context}: {error}"`
    pub fn failure(&self, context: &str, error: &EventHubError) {
        self.notify(NoticeLevel::Error, format!("{}: {}", context, error));
    }

    pub fn stats(&self) -> NotificationStats {
        NotificationStats {
            total_success: self.counters.success.load(Ordering::Relaxed),
            total_error: self.counters.error.load(Ordering::Relaxed),
            total_info: self.counters.info.load(Ordering::Relaxed),
        }
    }
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notices_reach_subscribers() {
        let service = NotificationService::default();
        let mut rx = service.subscribe();

        service.success("Event added successfully!");
        service.failure("Error deleting participant", &EventHubError::remote("permission denied"));

        assert_eq!(rx.recv().await.unwrap().level, NoticeLevel::Success);
        let failure = rx.recv().await.unwrap();
        assert_eq!(failure.message, "Error deleting participant: permission denied");

        let stats = service.stats();
        assert_eq!((stats.total_success, stats.total_error), (1, 1));
    }

    #[test]
    fn test_notify_without_subscribers_is_fine() {
        let service = NotificationService::new(4);
        service.info("nobody listening");
        assert_eq!(service.stats().total_info, 1);
    }
}
