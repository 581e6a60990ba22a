//! Client-side stores
//!
//! Each store owns the local projection of one remote table and is the only
//! component allowed to change it. Consumers read snapshots or follow the
//! store's `watch` channel.

pub mod projection;
pub mod collection;
pub mod events;
pub mod participants;
pub mod listener;
pub mod views;

pub use projection::{Projection, UpsertOutcome};
pub use collection::RemoteCollection;
pub use events::EventStore;
pub use participants::ParticipantStore;
pub use listener::SubscriptionHandle;
pub use views::{EventFilter, SortDirection, SortKey, SortOrder, StatusCounts};
