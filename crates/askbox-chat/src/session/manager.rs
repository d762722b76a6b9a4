//! ChatSession struct, initialization, clearing, and expiry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use askbox_common::{EventBus, ExpiryTrigger, ResetReason, SessionEvent, SessionId};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::store::{MemoryStore, SessionStore, LAST_ACTIVITY_KEY, MESSAGES_KEY, SESSION_ID_KEY};
use crate::{AnswerClient, ChatError, Message};

use super::types::{SessionReset, SessionSettings, SessionStart};

/// Mutable conversation state. Always accessed under the `Shared` mutex,
/// never across an await.
pub(crate) struct SessionState {
    pub(crate) session_id: SessionId,
    pub(crate) last_activity_at: i64,
    pub(crate) messages: Vec<Message>,
    pub(crate) draft: String,
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<SessionState>,
    pub(crate) pending: AtomicBool,
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) client: Arc<dyn AnswerClient>,
    pub(crate) events: EventBus,
    pub(crate) settings: SessionSettings,
}

impl Shared {
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn persist_messages(&self, messages: &[Message]) -> Result<(), ChatError> {
        let json = serde_json::to_string(messages)
            .map_err(|e| ChatError::Store(format!("failed to encode history: {e}")))?;
        self.store.set(MESSAGES_KEY, &json)
    }

    pub(crate) fn persist_activity(&self, at: i64) -> Result<(), ChatError> {
        self.store.set(LAST_ACTIVITY_KEY, &at.to_string())
    }

    /// Persist a fresh session. The id is written last so a failed write
    /// never pairs a new id with the previous conversation's history.
    fn persist_new_session(&self, id: &SessionId, now: i64) -> Result<(), ChatError> {
        self.store.remove(MESSAGES_KEY)?;
        self.persist_activity(now)?;
        self.store.set(SESSION_ID_KEY, id.as_str())
    }

    fn stored_activity(&self) -> Result<Option<i64>, ChatError> {
        Ok(self
            .store
            .get(LAST_ACTIVITY_KEY)?
            .and_then(|v| v.trim().parse::<i64>().ok()))
    }

    fn stored_messages(&self) -> Result<Vec<Message>, ChatError> {
        let Some(json) = self.store.get(MESSAGES_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&json) {
            Ok(messages) => Ok(messages),
            Err(e) => {
                warn!(error = %e, "Stored history is unreadable, starting empty");
                Ok(Vec::new())
            }
        }
    }
}

/// True when no activity was recorded, or more than `timeout_millis` has
/// elapsed since it was.
pub(crate) fn is_expired(last_activity: Option<i64>, now: i64, timeout_millis: i64) -> bool {
    match last_activity {
        None => true,
        Some(at) => now.saturating_sub(at) > timeout_millis,
    }
}

/// Builder for a `ChatSession` and its collaborators.
pub struct SessionBuilder {
    client: Arc<dyn AnswerClient>,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    events: EventBus,
}

impl SessionBuilder {
    pub fn new(client: Arc<dyn AnswerClient>) -> Self {
        Self {
            client,
            store: Arc::new(MemoryStore::new()),
            clock: Arc::new(SystemClock),
            settings: SessionSettings::default(),
            events: EventBus::default(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Resume the persisted session if it is still fresh, otherwise start a
    /// new one. Either way the identifier and a refreshed activity
    /// timestamp are written back to the store.
    pub fn initialize(self) -> Result<(ChatSession, SessionStart), ChatError> {
        let now = self.clock.now_millis();
        let timeout = self.settings.timeout_millis();

        let shared = Shared {
            state: Mutex::new(SessionState {
                session_id: SessionId::from(""),
                last_activity_at: now,
                messages: Vec::new(),
                draft: String::new(),
            }),
            pending: AtomicBool::new(false),
            store: self.store,
            clock: self.clock,
            client: self.client,
            events: self.events,
            settings: self.settings,
        };

        let stored_id = shared
            .store
            .get(SESSION_ID_KEY)?
            .filter(|id| !id.trim().is_empty());
        let last_activity = shared.stored_activity()?;

        let start = match stored_id {
            Some(id) if !is_expired(last_activity, now, timeout) => {
                let messages = shared.stored_messages()?;
                let start = SessionStart {
                    session_id: SessionId::from(id),
                    resumed: true,
                    reason: None,
                    restored_messages: messages.len(),
                };
                shared.persist_activity(now)?;
                info!(
                    session_id = %start.session_id,
                    messages = messages.len(),
                    "Session restored"
                );
                let mut state = shared.lock_state();
                state.session_id = start.session_id.clone();
                state.messages = messages;
                start
            }
            stored => {
                let reason = if stored.is_some() {
                    ResetReason::Inactive {
                        trigger: ExpiryTrigger::Startup,
                    }
                } else {
                    ResetReason::NoExistingSession
                };
                let session_id = SessionId::generate(now);
                shared.persist_new_session(&session_id, now)?;
                info!(session_id = %session_id, reason = ?reason, "New session created");
                shared.lock_state().session_id = session_id.clone();
                SessionStart {
                    session_id,
                    resumed: false,
                    reason: Some(reason),
                    restored_messages: 0,
                }
            }
        };

        shared.events.publish(SessionEvent::Started {
            session_id: start.session_id.to_string(),
            resumed: start.resumed,
        });

        Ok((
            ChatSession {
                inner: Arc::new(shared),
            },
            start,
        ))
    }
}

/// A conversation with the answering service.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct ChatSession {
    pub(crate) inner: Arc<Shared>,
}

impl ChatSession {
    pub fn builder(client: Arc<dyn AnswerClient>) -> SessionBuilder {
        SessionBuilder::new(client)
    }

    /// Start a new conversation. The backend is not told about the old one.
    pub fn clear(&self) -> Result<SessionId, ChatError> {
        let reset = self.reset(ResetReason::Cleared)?;
        info!(
            old_session_id = %reset.old_id,
            new_session_id = %reset.new_id,
            "Conversation cleared; old session left on server"
        );
        Ok(reset.new_id)
    }

    /// Replace the session if it has been idle longer than the threshold.
    ///
    /// Shared by the periodic watcher and the visibility trigger.
    pub fn check_expiry(&self, trigger: ExpiryTrigger) -> Result<Option<SessionReset>, ChatError> {
        let now = self.inner.clock.now_millis();
        let last_activity = self.inner.stored_activity()?;
        if !is_expired(last_activity, now, self.inner.settings.timeout_millis()) {
            debug!(?trigger, "Session still active");
            return Ok(None);
        }

        let reset = self.reset(ResetReason::Inactive { trigger })?;
        info!(
            old_session_id = %reset.old_id,
            new_session_id = %reset.new_id,
            ?trigger,
            "Session expired after inactivity"
        );
        Ok(Some(reset))
    }

    /// The interface became visible again; check expiry immediately.
    pub fn handle_visible(&self) -> Result<Option<SessionReset>, ChatError> {
        self.check_expiry(ExpiryTrigger::Visible)
    }

    /// New identifier, empty history, fresh activity timestamp, all persisted
    /// before the in-memory state is swapped. On a store error nothing in
    /// memory changes.
    fn reset(&self, reason: ResetReason) -> Result<SessionReset, ChatError> {
        let now = self.inner.clock.now_millis();
        let mut state = self.inner.lock_state();

        let mut new_id = SessionId::generate(now);
        while new_id == state.session_id {
            new_id = SessionId::generate(now);
        }

        self.inner.persist_new_session(&new_id, now)?;

        let old_id = std::mem::replace(&mut state.session_id, new_id.clone());
        state.messages.clear();
        state.last_activity_at = now;
        drop(state);

        self.inner.events.publish(SessionEvent::Reset {
            old_id: Some(old_id.to_string()),
            new_id: new_id.to_string(),
            reason,
        });

        Ok(SessionReset {
            old_id,
            new_id,
            reason,
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.inner.lock_state().session_id.clone()
    }

    /// Snapshot of the conversation, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock_state().messages.clone()
    }

    pub fn message_count(&self) -> usize {
        self.inner.lock_state().messages.len()
    }

    pub fn last_activity_at(&self) -> i64 {
        self.inner.lock_state().last_activity_at
    }

    /// Whether a request is in flight.
    pub fn is_pending(&self) -> bool {
        self.inner.pending.load(Ordering::Acquire)
    }

    pub fn draft(&self) -> String {
        self.inner.lock_state().draft.clone()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.inner.lock_state().draft = text.into();
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::session::testing::{scripted_session, FailingStore, ScriptedClient};
    use crate::store::MemoryStore;

    const START: i64 = 1_700_000_000_000;

    #[test]
    fn expiry_is_strictly_greater_than_threshold() {
        assert!(is_expired(None, START, 600_000));
        assert!(!is_expired(Some(START), START + 600_000, 600_000));
        assert!(is_expired(Some(START), START + 600_001, 600_000));
    }

    #[test]
    fn initialize_without_stored_session_creates_one() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(START));

        let (session, start) = scripted_session(ScriptedClient::new(), store.clone(), clock);

        assert!(!start.resumed);
        assert_eq!(start.reason, Some(ResetReason::NoExistingSession));
        assert!(session.messages().is_empty());
        assert_eq!(
            store.get(SESSION_ID_KEY).unwrap().as_deref(),
            Some(session.session_id().as_str())
        );
        assert_eq!(
            store.get(LAST_ACTIVITY_KEY).unwrap(),
            Some(START.to_string())
        );
    }

    #[test]
    fn initialize_resumes_fresh_session_with_history() {
        let store = Arc::new(MemoryStore::new());
        let history = vec![Message::user("hello"), Message::error("Sorry")];
        store.set(SESSION_ID_KEY, "session_1_resumeme1").unwrap();
        store
            .set(LAST_ACTIVITY_KEY, &(START - 5 * 60_000).to_string())
            .unwrap();
        store
            .set(MESSAGES_KEY, &serde_json::to_string(&history).unwrap())
            .unwrap();
        let clock = Arc::new(ManualClock::new(START));

        let (session, start) = scripted_session(ScriptedClient::new(), store.clone(), clock);

        assert!(start.resumed);
        assert_eq!(start.reason, None);
        assert_eq!(start.restored_messages, 2);
        assert_eq!(session.session_id().as_str(), "session_1_resumeme1");
        assert_eq!(session.messages(), history);
        // Activity is refreshed on resume.
        assert_eq!(
            store.get(LAST_ACTIVITY_KEY).unwrap(),
            Some(START.to_string())
        );
    }

    #[test]
    fn initialize_replaces_expired_session() {
        let store = Arc::new(MemoryStore::new());
        store.set(SESSION_ID_KEY, "session_1_stalestal").unwrap();
        store
            .set(LAST_ACTIVITY_KEY, &(START - 11 * 60_000).to_string())
            .unwrap();
        store
            .set(
                MESSAGES_KEY,
                &serde_json::to_string(&[Message::user("old")]).unwrap(),
            )
            .unwrap();
        let clock = Arc::new(ManualClock::new(START));

        let (session, start) = scripted_session(ScriptedClient::new(), store.clone(), clock);

        assert!(!start.resumed);
        assert_eq!(
            start.reason,
            Some(ResetReason::Inactive {
                trigger: ExpiryTrigger::Startup
            })
        );
        assert_ne!(session.session_id().as_str(), "session_1_stalestal");
        assert!(session.messages().is_empty());
        assert_eq!(store.get(MESSAGES_KEY).unwrap(), None);
    }

    #[test]
    fn initialize_treats_unparseable_activity_as_expired() {
        let store = Arc::new(MemoryStore::new());
        store.set(SESSION_ID_KEY, "session_1_garbage00").unwrap();
        store.set(LAST_ACTIVITY_KEY, "not-a-number").unwrap();
        let clock = Arc::new(ManualClock::new(START));

        let (session, start) = scripted_session(ScriptedClient::new(), store, clock);

        assert!(!start.resumed);
        assert_ne!(session.session_id().as_str(), "session_1_garbage00");
    }

    #[test]
    fn initialize_tolerates_corrupt_history() {
        let store = Arc::new(MemoryStore::new());
        store.set(SESSION_ID_KEY, "session_1_corrupt00").unwrap();
        store.set(LAST_ACTIVITY_KEY, &START.to_string()).unwrap();
        store.set(MESSAGES_KEY, "{broken").unwrap();
        let clock = Arc::new(ManualClock::new(START));

        let (session, start) = scripted_session(ScriptedClient::new(), store, clock);

        assert!(start.resumed);
        assert!(session.messages().is_empty());
    }

    #[test]
    fn clear_yields_new_id_and_empty_history() {
        let store = Arc::new(MemoryStore::new());
        let history = vec![Message::user("hello")];
        store.set(SESSION_ID_KEY, "session_1_clearme00").unwrap();
        store.set(LAST_ACTIVITY_KEY, &START.to_string()).unwrap();
        store
            .set(MESSAGES_KEY, &serde_json::to_string(&history).unwrap())
            .unwrap();
        let clock = Arc::new(ManualClock::new(START));
        let (session, _) = scripted_session(ScriptedClient::new(), store.clone(), clock.clone());
        assert_eq!(session.message_count(), 1);

        clock.advance(Duration::from_secs(30));
        let before = session.session_id();
        let new_id = session.clear().unwrap();

        assert_ne!(new_id, before);
        assert_eq!(session.session_id(), new_id);
        assert!(session.messages().is_empty());
        assert_eq!(session.last_activity_at(), START + 30_000);
        assert_eq!(
            store.get(SESSION_ID_KEY).unwrap().as_deref(),
            Some(new_id.as_str())
        );
        assert_eq!(store.get(MESSAGES_KEY).unwrap(), None);
    }

    fn seeded_failing_store(history: &[Message]) -> Arc<FailingStore> {
        let store = FailingStore::new();
        store.set(SESSION_ID_KEY, "session_1_keepme000").unwrap();
        store.set(LAST_ACTIVITY_KEY, &START.to_string()).unwrap();
        store
            .set(MESSAGES_KEY, &serde_json::to_string(history).unwrap())
            .unwrap();
        store
    }

    #[test]
    fn failed_history_write_on_clear_keeps_old_session() {
        let history = vec![Message::user("old question"), Message::error("old answer")];
        let store = seeded_failing_store(&history);
        let clock = Arc::new(ManualClock::new(START));
        let (session, _) = scripted_session(ScriptedClient::new(), store.clone(), clock.clone());

        store.fail_writes_to(MESSAGES_KEY);
        assert!(matches!(session.clear(), Err(ChatError::Store(_))));
        assert_eq!(session.session_id().as_str(), "session_1_keepme000");
        assert_eq!(session.messages(), history);

        let (relaunched, start) = scripted_session(ScriptedClient::new(), store, clock);
        assert!(start.resumed);
        assert_eq!(relaunched.session_id().as_str(), "session_1_keepme000");
        assert_eq!(relaunched.messages(), history);
    }

    #[test]
    fn failed_id_write_on_clear_never_mixes_history() {
        let history = vec![Message::user("old question")];
        let store = seeded_failing_store(&history);
        let clock = Arc::new(ManualClock::new(START));
        let (session, _) = scripted_session(ScriptedClient::new(), store.clone(), clock.clone());

        store.fail_writes_to(SESSION_ID_KEY);
        assert!(session.clear().is_err());
        assert_eq!(session.session_id().as_str(), "session_1_keepme000");

        // Whatever id survives, it never carries another session's history.
        let stored_id = store.get(SESSION_ID_KEY).unwrap();
        assert_eq!(stored_id.as_deref(), Some("session_1_keepme000"));
        assert_eq!(store.get(MESSAGES_KEY).unwrap(), None);
    }

    #[test]
    fn failed_write_on_expiry_leaves_session_untouched() {
        let store = seeded_failing_store(&[Message::user("hi")]);
        let clock = Arc::new(ManualClock::new(START));
        let (session, _) = scripted_session(ScriptedClient::new(), store.clone(), clock.clone());

        store.fail_writes_to(MESSAGES_KEY);
        clock.advance(Duration::from_secs(11 * 60));

        assert!(session.check_expiry(ExpiryTrigger::Tick).is_err());
        assert_eq!(session.session_id().as_str(), "session_1_keepme000");
        assert_eq!(session.message_count(), 1);
    }

    #[test]
    fn check_expiry_keeps_active_session() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(START));
        let (session, _) = scripted_session(ScriptedClient::new(), store, clock.clone());
        let id = session.session_id();

        clock.advance(Duration::from_secs(600));
        assert_eq!(session.check_expiry(ExpiryTrigger::Tick).unwrap(), None);
        assert_eq!(session.session_id(), id);
    }

    #[test]
    fn visibility_check_resets_idle_session() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(START));
        let (session, _) = scripted_session(ScriptedClient::new(), store, clock.clone());
        let id = session.session_id();

        clock.advance(Duration::from_secs(601));
        let reset = session.handle_visible().unwrap().expect("session should reset");

        assert_eq!(reset.old_id, id);
        assert_eq!(reset.new_id, session.session_id());
        assert_eq!(
            reset.reason,
            ResetReason::Inactive {
                trigger: ExpiryTrigger::Visible
            }
        );
        // Activity was refreshed, so an immediate re-check is a no-op.
        assert_eq!(session.handle_visible().unwrap(), None);
    }

    #[tokio::test]
    async fn reset_publishes_event() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(START));
        let (session, _) = scripted_session(ScriptedClient::new(), store, clock);
        let mut rx = session.subscribe();

        let new_id = session.clear().unwrap();

        match rx.recv().await.unwrap() {
            SessionEvent::Reset { new_id: id, reason, .. } => {
                assert_eq!(id, new_id.to_string());
                assert_eq!(reason, ResetReason::Cleared);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn draft_is_independent_of_activity() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(START));
        let (session, _) = scripted_session(ScriptedClient::new(), store, clock.clone());

        clock.advance(Duration::from_secs(5));
        session.set_draft("half a question");

        assert_eq!(session.draft(), "half a question");
        assert_eq!(session.last_activity_at(), START);
    }
}
