//! HTTP adapter for a PostgREST-style hosted backend
//!
//! Tables live under `/rest/v1`, auth under `/auth/v1` and object storage
//! under `/storage/v1`. The change feed is realised by polling a table
//! snapshot and diffing it by id, since this adapter carries no push
//! transport.

use std::sync::Arc;
use std::time::{Duration, Instant};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};
use crate::config::validation::validate_feed_config;
use crate::config::{BackendConfig, FeedConfig};
use crate::models::{Attachment, AuthEvent, AuthStateChange, AuthUser, RecordId, Session, SignUpOutcome};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::json_scalar_to_string;
use crate::utils::logging::{log_api_error, log_remote_call};
use super::feed::{diff_snapshots, index_rows, ChangeFeed};
use super::{Filter, Query, RemoteBackend, Row};

/// Token endpoint payload
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .or_else(|| token.expires_in.map(|secs| Utc::now() + chrono::Duration::seconds(secs)));
        Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        }
    }
}

/// Client for the hosted backend's HTTP APIs
#[derive(Clone)]
pub struct RestBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    session: Arc<RwLock<Option<Session>>>,
    auth_changes: broadcast::Sender<AuthStateChange>,
    poll_interval: Duration,
    feed_capacity: usize,
}

impl RestBackend {
    /// Create a new RestBackend instance
    pub fn new(backend: &BackendConfig, feed: &FeedConfig) -> Result<Self> {
        validate_feed_config(feed)?;
        let base = url::Url::parse(&backend.url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(backend.timeout_seconds))
            .user_agent(concat!("eventhub/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let (auth_changes, _) = broadcast::channel(16);

        Ok(Self {
            client,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            anon_key: backend.anon_key.clone(),
            session: Arc::new(RwLock::new(None)),
            auth_changes,
            poll_interval: Duration::from_millis(feed.poll_interval_ms),
            feed_capacity: feed.channel_capacity,
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, endpoint)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, encode_path(path))
    }

    /// Build a request carrying the api key and the session token, if any
    async fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone());

        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    async fn send(&self, operation: &str, table: &str, request: RequestBuilder) -> Result<Response> {
        let started = Instant::now();
        let response = request.send().await;
        let elapsed = started.elapsed().as_millis() as u64;

        match response {
            Ok(response) if response.status().is_success() => {
                log_remote_call(operation, table, elapsed, true);
                Ok(response)
            }
            Ok(response) => {
                log_remote_call(operation, table, elapsed, false);
                let err = remote_error(response).await;
                log_api_error("rest", &err, Some(operation));
                Err(err)
            }
            Err(e) => {
                log_remote_call(operation, table, elapsed, false);
                Err(e.into())
            }
        }
    }

    async fn rows(&self, operation: &str, table: &str, request: RequestBuilder) -> Result<Vec<Row>> {
        let response = self.send(operation, table, request).await?;
        Ok(response.json::<Vec<Row>>().await?)
    }

    async fn store_session(&self, session: Option<Session>, event: AuthEvent) {
        *self.session.write().await = session.clone();
        let _ = self.auth_changes.send(AuthStateChange { event, session });
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn filter_param(filter: &Filter) -> (String, String) {
    match filter {
        Filter::Eq(column, Value::Null) => (column.clone(), "is.null".to_string()),
        Filter::Neq(column, Value::Null) => (column.clone(), "not.is.null".to_string()),
        Filter::Eq(column, value) => (column.clone(), format!("eq.{}", json_scalar_to_string(value))),
        Filter::Neq(column, value) => (column.clone(), format!("neq.{}", json_scalar_to_string(value))),
    }
}

/// Query-string pairs for a select
pub(crate) fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(query.filters.iter().map(filter_param));
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    params
}

/// Turn a non-2xx response into a remote error carrying the body's message
async fn remote_error(response: Response) -> EventHubError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.trim().to_string()
            }
        });

    EventHubError::Remote { status: Some(status.as_u16()), message }
}

fn auth_failure(err: EventHubError) -> EventHubError {
    match err {
        EventHubError::Remote { status: Some(code), message }
            if code == StatusCode::BAD_REQUEST.as_u16() || code == StatusCode::UNAUTHORIZED.as_u16() =>
        {
            EventHubError::Authentication(message)
        }
        other => other,
    }
}

fn first_row(rows: Vec<Row>, table: &str, id: Option<&RecordId>) -> Result<Row> {
    rows.into_iter().next().ok_or_else(|| match id {
        Some(id) => EventHubError::NotFound { table: table.to_string(), id: id.to_string() },
        None => EventHubError::remote(format!("No row returned from {}", table)),
    })
}

#[async_trait]
impl RemoteBackend for RestBackend {
    async fn get_session(&self) -> Result<Option<Session>> {
        let mut session = self.session.write().await;
        if session.as_ref().is_some_and(Session::is_expired) {
            debug!("Stored session expired, discarding");
            *session = None;
        }
        Ok(session.clone())
    }

    async fn sign_up(&self, email: &str, password: &str, attributes: Value) -> Result<SignUpOutcome> {
        let request = self
            .request(Method::POST, &self.auth_url("signup"))
            .await
            .json(&json!({ "email": email, "password": password, "data": attributes }));
        let body: Value = self
            .send("signup", "auth", request)
            .await
            .map_err(auth_failure)?
            .json()
            .await?;

        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value::<TokenResponse>(body)?.into();
            let user = session.user.clone();
            self.store_session(Some(session.clone()), AuthEvent::SignedIn).await;
            info!(user_id = %user.id, "Signed up with immediate session");
            return Ok(SignUpOutcome { user, session: Some(session) });
        }

        let user: AuthUser = match body.get("user") {
            Some(user) => serde_json::from_value(user.clone())?,
            None => serde_json::from_value(body)?,
        };
        info!(user_id = %user.id, "Signed up, awaiting confirmation");
        Ok(SignUpOutcome { user, session: None })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let request = self
            .request(Method::POST, &self.auth_url("token"))
            .await
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let token: TokenResponse = self
            .send("sign_in", "auth", request)
            .await
            .map_err(auth_failure)?
            .json()
            .await?;

        let session: Session = token.into();
        self.store_session(Some(session.clone()), AuthEvent::SignedIn).await;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        let request = self.request(Method::POST, &self.auth_url("logout")).await;
        let result = self.send("sign_out", "auth", request).await.map(|_| ());
        // The local session is dropped even when the server call fails
        self.store_session(None, AuthEvent::SignedOut).await;
        result
    }

    fn on_auth_state_change(&self) -> broadcast::Receiver<AuthStateChange> {
        self.auth_changes.subscribe()
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        let request = self
            .request(Method::GET, &self.rest_url(table))
            .await
            .query(&query_params(query));
        self.rows("select", table, request).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        let request = self
            .request(Method::POST, &self.rest_url(table))
            .await
            .header("Prefer", "return=representation")
            .json(&vec![row]);
        let rows = self.rows("insert", table, request).await?;
        first_row(rows, table, None)
    }

    async fn update(&self, table: &str, id: &RecordId, patch: Row) -> Result<Row> {
        let request = self
            .request(Method::PATCH, &self.rest_url(table))
            .await
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(&patch);
        let rows = self.rows("update", table, request).await?;
        first_row(rows, table, Some(id))
    }

    async fn upsert(&self, table: &str, row: Row) -> Result<Row> {
        let request = self
            .request(Method::POST, &self.rest_url(table))
            .await
            .query(&[("on_conflict", "id")])
            .header("Prefer", "return=representation,resolution=merge-duplicates")
            .json(&vec![row]);
        let rows = self.rows("upsert", table, request).await?;
        first_row(rows, table, None)
    }

    async fn delete(&self, table: &str, id: &RecordId) -> Result<()> {
        let request = self
            .request(Method::DELETE, &self.rest_url(table))
            .await
            .query(&[("id", format!("eq.{}", id))]);
        self.send("delete", table, request).await?;
        Ok(())
    }

    async fn upload(&self, bucket: &str, path: &str, file: &Attachment, upsert: bool) -> Result<()> {
        let request = self
            .request(Method::POST, &self.object_url(bucket, path))
            .await
            .header("content-type", file.mime_type())
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(file.bytes.clone());
        self.send("upload", bucket, request).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> Result<String> {
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            bucket,
            encode_path(path)
        ))
    }

    async fn subscribe(&self, table: &str) -> Result<ChangeFeed> {
        let baseline = self.select(table, &Query::new()).await?;
        let (mut publisher, feed) = ChangeFeed::channel(table, self.feed_capacity);
        let this = self.clone();
        let table = table.to_string();

        tokio::spawn(async move {
            let mut known = index_rows(&baseline);
            let mut ticker = tokio::time::interval(this.poll_interval);
            // The first tick completes immediately; the baseline covers it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = publisher.cancelled() => break,
                    _ = ticker.tick() => {
                        match this.select(&table, &Query::new()).await {
                            Ok(rows) => {
                                for change in diff_snapshots(&table, &known, &rows) {
                                    if !publisher.publish(change).await {
                                        debug!(table = %table, "Polling feed consumer gone");
                                        return;
                                    }
                                }
                                known = index_rows(&rows);
                            }
                            Err(e) if e.is_recoverable() => {
                                warn!(table = %table, error = %e, "Change feed poll failed, retrying on next tick");
                            }
                            Err(e) => {
                                error!(
                                    table = %table,
                                    error = %e,
                                    severity = %e.severity(),
                                    "Change feed poll rejected, retrying on next tick"
                                );
                            }
                        }
                    }
                }
            }
            debug!(table = %table, "Polling change feed stopped");
        });

        Ok(feed)
    }
}
