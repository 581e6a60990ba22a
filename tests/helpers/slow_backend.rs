//! Backend wrapper with injected latency
//!
//! Delegates to an [`InMemoryBackend`] but delays profile writes and
//! profile reads, so a listener's profile read can finish after a sign-up
//! already stored the profile.

use std::time::Duration;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use eventhub::backend::{ChangeFeed, Query, Row};
use eventhub::models::{Attachment, AuthStateChange, RecordId, Session, SignUpOutcome};
use eventhub::{InMemoryBackend, RemoteBackend, Result};

#[derive(Clone)]
pub struct SlowBackend {
    pub inner: InMemoryBackend,
    pub upsert_delay: Duration,
    pub profile_read_delay: Duration,
}

impl SlowBackend {
    pub fn new(inner: InMemoryBackend) -> Self {
        Self {
            inner,
            upsert_delay: Duration::from_millis(30),
            profile_read_delay: Duration::from_millis(100),
        }
    }
}

#[async_trait]
impl RemoteBackend for SlowBackend {
    async fn get_session(&self) -> Result<Option<Session>> {
        self.inner.get_session().await
    }

    async fn sign_up(&self, email: &str, password: &str, attributes: Value) -> Result<SignUpOutcome> {
        self.inner.sign_up(email, password, attributes).await
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.inner.sign_in_with_password(email, password).await
    }

    async fn sign_out(&self) -> Result<()> {
        self.inner.sign_out().await
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthStateChange> {
        self.inner.on_auth_state_change()
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        // Read first, answer late: the caller sees the table as it was
        let rows = self.inner.select(table, query).await;
        if table == "profiles" {
            tokio::time::sleep(self.profile_read_delay).await;
        }
        rows
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, id: &RecordId, patch: Row) -> Result<Row> {
        self.inner.update(table, id, patch).await
    }

    async fn upsert(&self, table: &str, row: Row) -> Result<Row> {
        tokio::time::sleep(self.upsert_delay).await;
        self.inner.upsert(table, row).await
    }

    async fn delete(&self, table: &str, id: &RecordId) -> Result<()> {
        self.inner.delete(table, id).await
    }

    async fn upload(&self, bucket: &str, path: &str, file: &Attachment, upsert: bool) -> Result<()> {
        self.inner.upload(bucket, path, file, upsert).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> Result<String> {
        self.inner.public_url(bucket, path)
    }

    async fn subscribe(&self, table: &str) -> Result<ChangeFeed> {
        self.inner.subscribe(table).await
    }
}
