//! Authentication service implementation
//!
//! Wraps the backend's password auth and keeps an observable [`AuthState`]:
//! the signed-in identity, its profile and the status of the last auth
//! operation. The admin check reads the profile's role and is advisory only;
//! access rules on the backend are what actually protect data.

use std::sync::Arc;
use serde_json::json;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::backend::RemoteBackend;
use crate::models::{AuthEvent, AuthStateChange, AuthUser, Profile, ProfileUpsert, RecordId, Role};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::is_valid_email;
use super::profile::ProfileService;

/// What the client currently knows about who is signed in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub profile: Option<Profile>,
    pub loading: bool,
    pub error: Option<String>,
}

impl AuthState {
    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().is_some_and(Profile::is_admin)
    }
}

/// Signup form contents
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl SignUpRequest {
    pub fn validate(&self) -> Result<()> {
        if !is_valid_email(&self.email) {
            return Err(EventHubError::InvalidInput(format!("Invalid email address: {}", self.email)));
        }
        if self.password.is_empty() {
            return Err(EventHubError::InvalidInput("Password is required".to_string()));
        }
        Ok(())
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    backend: Arc<dyn RemoteBackend>,
    profiles: ProfileService,
    state: Arc<watch::Sender<AuthState>>,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(backend: Arc<dyn RemoteBackend>, profiles: ProfileService) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            backend,
            profiles,
            state: Arc::new(state),
        }
    }

    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().user.clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.state.borrow().profile.clone()
    }

    /// Advisory admin check against the loaded profile
    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    /// Profile of the signed-in admin, or `PermissionDenied`
    pub fn require_admin(&self) -> Result<Profile> {
        match self.profile() {
            Some(profile) if profile.is_admin() => Ok(profile),
            Some(profile) => Err(EventHubError::PermissionDenied(format!(
                "Account {} is not an administrator",
                profile.id
            ))),
            None => Err(EventHubError::PermissionDenied("Not signed in".to_string())),
        }
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn fail(&self, action: &str, err: &EventHubError) {
        log_auth_event(None, action, false, Some(&err.to_string()));
        let message = err.to_string();
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = Some(message);
        });
    }

    fn signed_in(&self, user: AuthUser, profile: Option<Profile>) {
        self.state.send_modify(|s| {
            s.user = Some(user);
            s.profile = profile;
            s.loading = false;
        });
    }

    async fn load_profile(&self, id: &RecordId) -> Option<Profile> {
        match self.profiles.fetch_profile(id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %id, error = %e, "Failed to load profile");
                None
            }
        }
    }

    /// Restore an existing session and load its profile
    pub async fn init(&self) -> Result<AuthState> {
        self.begin();
        match self.backend.get_session().await {
            Ok(Some(session)) => {
                let profile = self.load_profile(&session.user.id).await;
                debug!(user_id = %session.user.id, "Restored session");
                self.signed_in(session.user, profile);
            }
            Ok(None) => {
                self.state.send_modify(|s| {
                    s.user = None;
                    s.profile = None;
                    s.loading = false;
                });
            }
            Err(e) => {
                self.fail("init", &e);
                return Err(e);
            }
        }
        Ok(self.state())
    }

    /// Create the auth identity, then its profile row with the chosen role
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<AuthUser> {
        request.validate()?;
        self.begin();

        let result = self.register(&request).await;
        match result {
            Ok((user, profile)) => {
                log_auth_event(Some(&user.id), "sign_up", true, None);
                self.signed_in(user.clone(), Some(profile));
                Ok(user)
            }
            Err(e) => {
                self.fail("sign_up", &e);
                Err(e)
            }
        }
    }

    async fn register(&self, request: &SignUpRequest) -> Result<(AuthUser, Profile)> {
        let attributes = json!({
            "role": request.role,
            "firstName": request.first_name,
            "lastName": request.last_name,
        });
        let outcome = self
            .backend
            .sign_up(request.email.trim(), &request.password, attributes)
            .await?;

        let profile = self
            .profiles
            .upsert_profile(ProfileUpsert {
                id: outcome.user.id.clone(),
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                email: request.email.trim().to_string(),
                role: request.role,
                avatar_url: None,
                updated_at: None,
            })
            .await?;
        Ok((outcome.user, profile))
    }

    pub async fn log_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        self.begin();
        match self.backend.sign_in_with_password(email.trim(), password).await {
            Ok(session) => {
                let profile = self.load_profile(&session.user.id).await;
                log_auth_event(Some(&session.user.id), "log_in", true, None);
                self.signed_in(session.user.clone(), profile);
                Ok(session.user)
            }
            Err(e) => {
                self.fail("log_in", &e);
                Err(e)
            }
        }
    }

    pub async fn log_out(&self) -> Result<()> {
        let user_id = self.current_user().map(|u| u.id);
        let result = self.backend.sign_out().await;
        self.state.send_modify(|s| {
            s.user = None;
            s.profile = None;
            s.loading = false;
            s.error = result.as_ref().err().map(ToString::to_string);
        });
        log_auth_event(user_id.as_ref(), "log_out", result.is_ok(), None);
        result
    }

    /// Follow the backend's auth state changes until the listener is stopped
    pub fn listen(&self) -> AuthListener {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let mut changes = self.backend.on_auth_state_change();
        let service = self.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    stop = shutdown_rx.changed() => {
                        if stop.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    change = changes.recv() => match change {
                        Ok(change) => service.apply(change).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped = skipped, "Auth listener lagged behind");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
            debug!("Auth listener stopped");
        });

        AuthListener { shutdown_tx, task }
    }

    async fn apply(&self, change: AuthStateChange) {
        match (change.event, change.session) {
            (AuthEvent::SignedIn, Some(session)) => {
                let loaded = self.load_profile(&session.user.id).await;
                let user = session.user;
                self.state.send_modify(|s| {
                    // A sign-up may have stored the profile while the read was in flight
                    let known = s.profile.take().filter(|p| p.id == user.id);
                    s.profile = loaded.or(known);
                    s.user = Some(user);
                    s.loading = false;
                });
            }
            (AuthEvent::SignedIn, None) => {
                warn!("Sign-in notification without a session");
            }
            (AuthEvent::SignedOut, _) => {
                self.state.send_modify(|s| {
                    s.user = None;
                    s.profile = None;
                    s.loading = false;
                });
            }
        }
    }
}

/// Handle of a running auth state listener
pub struct AuthListener {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AuthListener {
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Auth listener task failed");
        }
    }
}

/// Log authentication event
fn log_auth_event(user_id: Option<&RecordId>, action: &str, success: bool, details: Option<&str>) {
    let user_id = user_id.map(RecordId::as_str);
    if success {
        info!(user_id = user_id, action = action, details = details, "Authentication event: success");
    } else {
        warn!(user_id = user_id, action = action, details = details, "Authentication event: failure");
    }
}
