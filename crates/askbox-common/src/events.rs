use tokio::sync::broadcast;

/// What prompted an inactivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryTrigger {
    Startup,
    Tick,
    Visible,
}

/// Why a session identifier was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    NoExistingSession,
    Inactive { trigger: ExpiryTrigger },
    Cleared,
}

/// Notifications published by a chat session for presentation code.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started { session_id: String, resumed: bool },
    Reset { old_id: Option<String>, new_id: String, reason: ResetReason },
    MessageAppended { session_id: String, index: usize },
    PendingChanged(bool),
    FocusRequested,
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
