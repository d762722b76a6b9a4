//! Shared types for askbox: errors, session identifiers, and the event bus.

pub mod errors;
pub mod events;
pub mod id;

pub use errors::{AskboxError, ConfigError};
pub use events::{EventBus, ExpiryTrigger, ResetReason, SessionEvent};
pub use id::{new_session_id, SessionId};
