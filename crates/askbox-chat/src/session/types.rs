//! Session types and the pending-request guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use askbox_common::{EventBus, ResetReason, SessionEvent, SessionId};

use crate::{ChatError, Message};

/// Tunables for one chat session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Idle time after which the identifier is replaced.
    pub inactivity_timeout: Duration,
    /// Period of the background expiry check.
    pub check_interval: Duration,
    /// Assistant text used when a request fails.
    pub error_message: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(10 * 60),
            check_interval: Duration::from_secs(60),
            error_message: "Sorry, an error occurred".to_string(),
        }
    }
}

impl SessionSettings {
    pub(crate) fn timeout_millis(&self) -> i64 {
        i64::try_from(self.inactivity_timeout.as_millis()).unwrap_or(i64::MAX)
    }
}

/// How `initialize` obtained its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStart {
    pub session_id: SessionId,
    /// True when a persisted session was picked up again.
    pub resumed: bool,
    /// Why a new identifier was generated; `None` when resumed.
    pub reason: Option<ResetReason>,
    pub restored_messages: usize,
}

/// Record of an identifier replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReset {
    pub old_id: SessionId,
    pub new_id: SessionId,
    pub reason: ResetReason,
}

/// Result of a `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// The assistant message that was appended (check `is_error`).
    Completed(Message),
    /// The session was replaced while the request was in flight, so the
    /// reply was dropped instead of leaking into the new conversation.
    Discarded,
}

/// Guard that clears the pending flag on drop, ensuring it is always released
/// even if the submit future is cancelled or an early return occurs.
pub(crate) struct PendingGuard<'a> {
    flag: &'a AtomicBool,
    events: &'a EventBus,
}

impl<'a> PendingGuard<'a> {
    /// Attempt to claim the pending flag. Returns `Busy` if already claimed.
    pub(crate) fn acquire(flag: &'a AtomicBool, events: &'a EventBus) -> Result<Self, ChatError> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(ChatError::Busy);
        }
        events.publish(SessionEvent::PendingChanged(true));
        Ok(Self { flag, events })
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.events.publish(SessionEvent::PendingChanged(false));
    }
}
