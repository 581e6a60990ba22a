//! Remote service adapters
//!
//! Everything the crate persists goes through [`RemoteBackend`], the
//! interface of the hosted backend-as-a-service: authentication, table
//! reads and writes, object storage and the row-level change feed.
//! Rows cross this boundary as JSON objects and are decoded into typed
//! records by the stores.

pub mod feed;
pub mod memory;
pub mod rest;

pub use feed::{ChangeFeed, ChangeKind, FeedPublisher, RowChange};
pub use memory::{InMemoryBackend, Operation};
pub use rest::RestBackend;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use crate::models::{Attachment, AuthStateChange, RecordId, Session, SignUpOutcome};
use crate::utils::errors::Result;

/// A raw table row
pub type Row = Value;

/// Server-side row filter
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Neq(String, Value),
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::Neq(column, _) => column,
        }
    }

    /// Whether a row passes this filter
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::Eq(column, value) => row.get(column).unwrap_or(&Value::Null) == value,
            Filter::Neq(column, value) => row.get(column).unwrap_or(&Value::Null) != value,
        }
    }
}

/// Server-side sort order
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Filter and sort applied by the backend on a select
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.into()));
        self
    }

    pub fn neq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Neq(column.into(), value.into()));
        self
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order { column: column.into(), ascending });
        self
    }
}

/// Contract of the hosted backend
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    // Authentication

    /// Session currently held by this client, if any
    async fn get_session(&self) -> Result<Option<Session>>;

    async fn sign_up(&self, email: &str, password: &str, attributes: Value) -> Result<SignUpOutcome>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_out(&self) -> Result<()>;

    /// Stream of `(event, session)` pairs, one per auth state transition
    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthStateChange>;

    // Tables

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>>;

    /// Insert one row and return it with server-generated defaults filled in
    async fn insert(&self, table: &str, row: Row) -> Result<Row>;

    /// Patch the row with the given id and return its new value
    async fn update(&self, table: &str, id: &RecordId, patch: Row) -> Result<Row>;

    /// Insert or merge by id
    async fn upsert(&self, table: &str, row: Row) -> Result<Row>;

    async fn delete(&self, table: &str, id: &RecordId) -> Result<()>;

    // Object storage

    async fn upload(&self, bucket: &str, path: &str, file: &Attachment, upsert: bool) -> Result<()>;

    fn public_url(&self, bucket: &str, path: &str) -> Result<String>;

    // Change feed

    /// Subscribe to every row-level change of a table
    async fn subscribe(&self, table: &str) -> Result<ChangeFeed>;
}
