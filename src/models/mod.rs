//! Data models module
//!
//! This module contains the typed records mirrored from the remote tables
//! and the payloads written to them.

pub mod record;
pub mod event;
pub mod participant;
pub mod profile;
pub mod attachment;
pub mod session;

// Re-export commonly used models
pub use record::{Record, RecordId};
pub use event::{Event, EventCategory, EventStatus, EventUpdate, NewEvent, StatusChange};
pub use participant::{NewParticipant, Participant};
pub use profile::{Profile, ProfileEdit, ProfileUpsert, Role};
pub use attachment::Attachment;
pub use session::{AuthEvent, AuthStateChange, AuthUser, Session, SignUpOutcome};
