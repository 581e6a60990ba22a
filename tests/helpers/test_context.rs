//! Test context setup
//!
//! Builds an isolated [`AppContext`] over a fresh in-memory backend for each
//! test, plus small polling helpers for assertions on background tasks.

use std::sync::Arc;
use std::time::Duration;
use eventhub::config::Settings;
use eventhub::models::{AuthUser, Role};
use eventhub::services::SignUpRequest;
use eventhub::{AppContext, InMemoryBackend};

pub struct TestContext {
    pub backend: InMemoryBackend,
    pub app: AppContext,
}

impl TestContext {
    pub fn new() -> Self {
        let backend = InMemoryBackend::new();
        let app = AppContext::new(Settings::default(), Arc::new(backend.clone()));
        Self { backend, app }
    }

    /// Register an account with the given role and leave it signed in
    pub async fn sign_up(&self, email: &str, role: Role) -> AuthUser {
        self.app
            .auth()
            .sign_up(SignUpRequest {
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                email: email.to_string(),
                password: "secret-password".to_string(),
                role,
            })
            .await
            .expect("sign up")
    }

    pub async fn sign_up_admin(&self) -> AuthUser {
        self.sign_up("admin@example.com", Role::Admin).await
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Give background tasks a moment to drain their queues
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
