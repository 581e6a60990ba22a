//! Mock hosted backend for testing
//!
//! This module provides a wiremock server that answers the PostgREST-style
//! table, auth and storage endpoints the REST adapter talks to.

use serde_json::{json, Value};
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};
use eventhub::config::Settings;
use eventhub::RestBackend;

pub const TEST_ANON_KEY: &str = "test-anon-key";

/// Mock backend server
pub struct BackendMockServer {
    pub server: MockServer,
}

/// Configuration for mock responses
#[derive(Debug, Clone)]
pub struct MockResponseConfig {
    pub success: bool,
    pub delay_ms: Option<u64>,
    pub custom_response: Option<Value>,
}

impl Default for MockResponseConfig {
    fn default() -> Self {
        Self {
            success: true,
            delay_ms: None,
            custom_response: None,
        }
    }
}

impl MockResponseConfig {
    pub fn failure(message: &str) -> Self {
        Self {
            success: false,
            delay_ms: None,
            custom_response: Some(json!({
                "code": "42501",
                "message": message,
                "details": null,
                "hint": null
            })),
        }
    }
}

fn respond(config: MockResponseConfig, success_status: u16, default_body: Value) -> ResponseTemplate {
    let status = if config.success { success_status } else { 400 };
    let body = config.custom_response.unwrap_or(default_body);
    let mut response = ResponseTemplate::new(status).set_body_json(body);
    if let Some(delay) = config.delay_ms {
        response = response.set_delay(std::time::Duration::from_millis(delay));
    }
    response
}

impl BackendMockServer {
    /// Start a new mock backend
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Settings pointing at this server with a fast polling feed
    pub fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        settings.backend.url = self.uri();
        settings.backend.anon_key = TEST_ANON_KEY.to_string();
        settings.backend.timeout_seconds = 5;
        settings.feed.poll_interval_ms = 25;
        settings
    }

    pub fn rest_backend(&self) -> RestBackend {
        let settings = self.settings();
        RestBackend::new(&settings.backend, &settings.feed).expect("rest backend")
    }

    /// Setup mock for `GET /rest/v1/{table}`
    pub async fn mock_select(&self, table: &str, rows: Vec<Value>, config: MockResponseConfig) {
        Mock::given(method("GET"))
            .and(path(format!("/rest/v1/{}", table)))
            .and(header("apikey", TEST_ANON_KEY))
            .respond_with(respond(config, 200, Value::Array(rows)))
            .mount(&self.server)
            .await;
    }

    /// Setup mock for `POST /rest/v1/{table}` returning the stored row
    pub async fn mock_insert(&self, table: &str, row: Value, config: MockResponseConfig) {
        Mock::given(method("POST"))
            .and(path(format!("/rest/v1/{}", table)))
            .and(header("Prefer", "return=representation"))
            .respond_with(respond(config, 201, json!([row])))
            .mount(&self.server)
            .await;
    }

    /// Setup mock for `PATCH /rest/v1/{table}?id=eq.{id}`
    pub async fn mock_update(&self, table: &str, id: &str, row: Value, config: MockResponseConfig) {
        Mock::given(method("PATCH"))
            .and(path(format!("/rest/v1/{}", table)))
            .and(query_param("id", format!("eq.{}", id)))
            .respond_with(respond(config, 200, json!([row])))
            .mount(&self.server)
            .await;
    }

    /// Setup mock for `DELETE /rest/v1/{table}?id=eq.{id}`
    pub async fn mock_delete(&self, table: &str, id: &str, config: MockResponseConfig) {
        let status = if config.success { 204 } else { 400 };
        let mut response = ResponseTemplate::new(status);
        if let Some(body) = config.custom_response {
            response = response.set_body_json(body);
        }
        Mock::given(method("DELETE"))
            .and(path(format!("/rest/v1/{}", table)))
            .and(query_param("id", format!("eq.{}", id)))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Setup mock for the password grant
    pub async fn mock_token(&self, user_id: &str, email: &str, config: MockResponseConfig) {
        let default_body = json!({
            "access_token": "user-jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh",
            "user": { "id": user_id, "email": email, "user_metadata": { "role": "user" } }
        });
        let config = if config.success || config.custom_response.is_some() {
            config
        } else {
            MockResponseConfig {
                custom_response: Some(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid login credentials"
                })),
                ..config
            }
        };
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(respond(config, 200, default_body))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_logout(&self) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&self.server)
            .await;
    }

    /// Setup mock for any object upload into `bucket`
    pub async fn mock_upload(&self, bucket: &str, config: MockResponseConfig) {
        let body = json!({ "Key": format!("{}/object", bucket) });
        Mock::given(method("POST"))
            .and(wiremock::matchers::path_regex(format!(r"^/storage/v1/object/{}/.+$", bucket)))
            .respond_with(respond(config, 200, body))
            .mount(&self.server)
            .await;
    }

    /// Drop all mounted mocks and recorded requests
    pub async fn reset(&self) {
        self.server.reset().await;
    }
}
