//! EventHub client core
//!
//! Client-side mirrors of a hosted backend's `events` and `participants`
//! tables. Stores fetch server-filtered snapshots, reconcile single-record
//! mutations and follow the row-level change feed, publishing every change
//! of their local projection to subscribed consumers. Authentication,
//! profiles, media uploads and moderation sit alongside as services.

pub mod backend;
pub mod config;
pub mod context;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use context::AppContext;
pub use utils::errors::{EventHubError, Result};

// Re-export main components for easy access
pub use backend::{InMemoryBackend, RemoteBackend, RestBackend};
pub use services::ServiceFactory;
pub use store::{EventStore, ParticipantStore, Projection, SubscriptionHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
