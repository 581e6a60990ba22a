//! In-process backend
//!
//! A complete stand-in for the hosted service: tables with server-side
//! defaults, filtering and ordering, password auth with a single client
//! session, object storage and a broadcast change feed. Any operation can be
//! made to fail once with [`InMemoryBackend::fail_next`], which is how tests
//! simulate remote failures.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};
use crate::models::{Attachment, AuthEvent, AuthStateChange, AuthUser, RecordId, Session, SignUpOutcome};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::{compare_json_values, format_timestamp, generate_uuid};
use super::feed::{ChangeFeed, RowChange};
use super::{Query, RemoteBackend, Row};

const PUBLIC_BASE: &str = "memory://local";

/// Backend operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Upsert,
    Delete,
    Upload,
    Subscribe,
    SignUp,
    SignIn,
    SignOut,
}

struct StoredUser {
    password: String,
    user: AuthUser,
}

struct Inner {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    users: Mutex<HashMap<String, StoredUser>>,
    session: Mutex<Option<Session>>,
    failures: Mutex<HashMap<Operation, VecDeque<String>>>,
    changes: broadcast::Sender<RowChange>,
    auth_changes: broadcast::Sender<AuthStateChange>,
    active_feeds: AtomicUsize,
    feed_capacity: usize,
}

/// Shared, cloneable in-process backend
#[derive(Clone)]
pub struct InMemoryBackend {
    inner: Arc<Inner>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_feed_capacity(256)
    }

    pub fn with_feed_capacity(feed_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(feed_capacity.max(1));
        let (auth_changes, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(HashMap::new()),
                objects: Mutex::new(HashMap::new()),
                users: Mutex::new(HashMap::new()),
                session: Mutex::new(None),
                failures: Mutex::new(HashMap::new()),
                changes,
                auth_changes,
                active_feeds: AtomicUsize::new(0),
                feed_capacity: feed_capacity.max(1),
            }),
        }
    }

    /// Make the next call of `operation` fail with `message`
    pub async fn fail_next(&self, operation: Operation, message: impl Into<String>) {
        self.inner
            .failures
            .lock()
            .await
            .entry(operation)
            .or_default()
            .push_back(message.into());
    }

    /// Put rows straight into a table without emitting notifications
    pub async fn seed(&self, table: &str, rows: Vec<Row>) {
        let mut tables = self.inner.tables.lock().await;
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Current raw contents of a table, in storage order
    pub async fn rows(&self, table: &str) -> Vec<Row> {
        self.inner.tables.lock().await.get(table).cloned().unwrap_or_default()
    }

    /// Stored bytes of an uploaded object
    pub async fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.inner.objects.lock().await.get(&object_key(bucket, path)).cloned()
    }

    pub async fn object_count(&self) -> usize {
        self.inner.objects.lock().await.len()
    }

    /// Publish a notification to every subscriber without touching any table,
    /// as the transport would for a write made by another client
    pub fn emit(&self, change: RowChange) {
        let _ = self.inner.changes.send(change);
    }

    /// Number of feeds still forwarding notifications
    pub fn active_feeds(&self) -> usize {
        self.inner.active_feeds.load(Ordering::Acquire)
    }

    async fn take_failure(&self, operation: Operation) -> Result<()> {
        let mut failures = self.inner.failures.lock().await;
        match failures.get_mut(&operation).and_then(|queue| queue.pop_front()) {
            Some(message) => {
                debug!(operation = ?operation, message = %message, "Injected backend failure");
                Err(EventHubError::remote(message))
            }
            None => Ok(()),
        }
    }

    async fn set_session(&self, session: Option<Session>, event: AuthEvent) {
        *self.inner.session.lock().await = session.clone();
        let _ = self.inner.auth_changes.send(AuthStateChange { event, session });
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn object_key(bucket: &str, path: &str) -> String {
    format!("{}/{}", bucket, path)
}

fn as_object(row: Row) -> Result<Map<String, Value>> {
    match row {
        Value::Object(map) => Ok(map),
        other => Err(EventHubError::InvalidInput(format!("Row must be a JSON object, got {}", other))),
    }
}

/// Column the server stamps with the insertion time
fn timestamp_column(table: &str) -> &'static str {
    match table {
        "participants" => "added_at",
        _ => "created_at",
    }
}

fn apply_defaults(table: &str, mut row: Map<String, Value>) -> Map<String, Value> {
    if !matches!(row.get("id"), Some(Value::String(_)) | Some(Value::Number(_))) {
        row.insert("id".to_string(), Value::String(generate_uuid()));
    }
    let column = timestamp_column(table);
    if row.get(column).map_or(true, Value::is_null) {
        row.insert(column.to_string(), Value::String(format_timestamp(Utc::now())));
    }
    row
}

fn position_of(rows: &[Row], id: &RecordId) -> Option<usize> {
    rows.iter().position(|row| RecordId::from_row(row).as_ref() == Some(id))
}

#[async_trait]
impl RemoteBackend for InMemoryBackend {
    async fn get_session(&self) -> Result<Option<Session>> {
        Ok(self.inner.session.lock().await.clone())
    }

    async fn sign_up(&self, email: &str, password: &str, attributes: Value) -> Result<SignUpOutcome> {
        self.take_failure(Operation::SignUp).await?;
        let key = email.trim().to_lowercase();
        if key.is_empty() || password.is_empty() {
            return Err(EventHubError::remote("Signup requires a valid email and password"));
        }

        let user = {
            let mut users = self.inner.users.lock().await;
            if users.contains_key(&key) {
                return Err(EventHubError::remote("User already registered"));
            }
            let user = AuthUser {
                id: RecordId::new(generate_uuid()),
                email: Some(key.clone()),
                user_metadata: attributes,
            };
            users.insert(key, StoredUser { password: password.to_string(), user: user.clone() });
            user
        };

        let session = Session {
            access_token: generate_uuid(),
            refresh_token: None,
            expires_at: None,
            user: user.clone(),
        };
        self.set_session(Some(session.clone()), AuthEvent::SignedIn).await;
        Ok(SignUpOutcome { user, session: Some(session) })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.take_failure(Operation::SignIn).await?;
        let user = {
            let users = self.inner.users.lock().await;
            match users.get(&email.trim().to_lowercase()) {
                Some(stored) if stored.password == password => stored.user.clone(),
                _ => return Err(EventHubError::Authentication("Invalid login credentials".to_string())),
            }
        };

        let session = Session {
            access_token: generate_uuid(),
            refresh_token: None,
            expires_at: None,
            user,
        };
        self.set_session(Some(session.clone()), AuthEvent::SignedIn).await;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        self.take_failure(Operation::SignOut).await?;
        self.set_session(None, AuthEvent::SignedOut).await;
        Ok(())
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthStateChange> {
        self.inner.auth_changes.subscribe()
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        self.take_failure(Operation::Select).await?;
        let tables = self.inner.tables.lock().await;
        let mut rows: Vec<Row> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| f.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_json_values(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                if order.ascending { ordering } else { ordering.reverse() }
            });
        }

        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        self.take_failure(Operation::Insert).await?;
        let row = Value::Object(apply_defaults(table, as_object(row)?));
        let id = RecordId::from_row(&row)
            .ok_or_else(|| EventHubError::remote("Row has no usable id"))?;

        {
            let mut tables = self.inner.tables.lock().await;
            let rows = tables.entry(table.to_string()).or_default();
            if position_of(rows, &id).is_some() {
                return Err(EventHubError::remote(format!(
                    "duplicate key value violates unique constraint \"{}_pkey\"",
                    table
                )));
            }
            rows.push(row.clone());
        }

        let _ = self.inner.changes.send(RowChange::insert(table, row.clone()));
        Ok(row)
    }

    async fn update(&self, table: &str, id: &RecordId, patch: Row) -> Result<Row> {
        self.take_failure(Operation::Update).await?;
        let patch = as_object(patch)?;

        let (old, new) = {
            let mut tables = self.inner.tables.lock().await;
            let rows = tables.entry(table.to_string()).or_default();
            let index = position_of(rows, id).ok_or_else(|| EventHubError::NotFound {
                table: table.to_string(),
                id: id.to_string(),
            })?;
            let old = rows[index].clone();
            let mut merged = as_object(old.clone())?;
            for (key, value) in patch {
                if key != "id" {
                    merged.insert(key, value);
                }
            }
            let new = Value::Object(merged);
            rows[index] = new.clone();
            (old, new)
        };

        let _ = self.inner.changes.send(RowChange::update(table, new.clone(), Some(old)));
        Ok(new)
    }

    async fn upsert(&self, table: &str, row: Row) -> Result<Row> {
        self.take_failure(Operation::Upsert).await?;
        let row = as_object(row)?;
        let id = RecordId::from_row(&Value::Object(row.clone()))
            .ok_or_else(|| EventHubError::InvalidInput("Upsert requires an id".to_string()))?;

        let change = {
            let mut tables = self.inner.tables.lock().await;
            let rows = tables.entry(table.to_string()).or_default();
            match position_of(rows, &id) {
                Some(index) => {
                    let old = rows[index].clone();
                    let mut merged = as_object(old.clone())?;
                    merged.extend(row);
                    let new = Value::Object(merged);
                    rows[index] = new.clone();
                    RowChange::update(table, new, Some(old))
                }
                None => {
                    let new = Value::Object(apply_defaults(table, row));
                    rows.push(new.clone());
                    RowChange::insert(table, new)
                }
            }
        };

        let stored = change.new_row.clone().unwrap_or(Value::Null);
        let _ = self.inner.changes.send(change);
        Ok(stored)
    }

    async fn delete(&self, table: &str, id: &RecordId) -> Result<()> {
        self.take_failure(Operation::Delete).await?;
        let removed = {
            let mut tables = self.inner.tables.lock().await;
            tables
                .get_mut(table)
                .and_then(|rows| position_of(rows, id).map(|index| rows.remove(index)))
        };

        if let Some(old) = removed {
            let _ = self.inner.changes.send(RowChange::delete(table, old));
        }
        Ok(())
    }

    async fn upload(&self, bucket: &str, path: &str, file: &Attachment, upsert: bool) -> Result<()> {
        self.take_failure(Operation::Upload).await?;
        let mut objects = self.inner.objects.lock().await;
        let key = object_key(bucket, path);
        if !upsert && objects.contains_key(&key) {
            return Err(EventHubError::remote("The resource already exists"));
        }
        objects.insert(key, file.bytes.clone());
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> Result<String> {
        Ok(format!("{}/storage/v1/object/public/{}/{}", PUBLIC_BASE, bucket, path))
    }

    async fn subscribe(&self, table: &str) -> Result<ChangeFeed> {
        self.take_failure(Operation::Subscribe).await?;
        let (mut publisher, feed) = ChangeFeed::channel(table, self.inner.feed_capacity);
        let mut rx = self.inner.changes.subscribe();
        let table = table.to_string();
        let inner = Arc::clone(&self.inner);

        inner.active_feeds.fetch_add(1, Ordering::AcqRel);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = publisher.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(change) if change.table == table => {
                            if !publisher.publish(change).await {
                                break;
                            }
                        }
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(table = %table, skipped = skipped, "Change feed subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
            inner.active_feeds.fetch_sub(1, Ordering::AcqRel);
            debug!(table = %table, "In-memory change feed stopped");
        });

        Ok(feed)
    }
}
