//! Test doubles for driving a session without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::clock::ManualClock;
use crate::store::{MemoryStore, SessionStore};
use crate::{AnswerClient, AskRequest, AskResponse, ChatError};

use super::{ChatSession, SessionBuilder, SessionSettings, SessionStart};

/// Answers from a queue of canned results and records every request.
/// With a gate, each call waits for `release()` before answering.
#[derive(Default)]
pub(crate) struct ScriptedClient {
    replies: Mutex<VecDeque<Result<AskResponse, ChatError>>>,
    requests: Mutex<Vec<AskRequest>>,
    gate: Option<Notify>,
}

impl ScriptedClient {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Notify::new()),
            ..Self::default()
        })
    }

    pub(crate) fn reply(self: &Arc<Self>, result: Result<AskResponse, ChatError>) -> Arc<Self> {
        self.replies.lock().unwrap().push_back(result);
        Arc::clone(self)
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub(crate) fn requests(&self) -> Vec<AskRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerClient for ScriptedClient {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ChatError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChatError::Network("no scripted reply".into())))
    }
}

/// In-memory store whose writes to one chosen key fail.
#[derive(Default)]
pub(crate) struct FailingStore {
    inner: MemoryStore,
    failing: Mutex<Option<&'static str>>,
}

impl FailingStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_writes_to(&self, key: &'static str) {
        *self.failing.lock().unwrap() = Some(key);
    }

    fn check(&self, key: &str) -> Result<(), ChatError> {
        match *self.failing.lock().unwrap() {
            Some(failing) if failing == key => Err(ChatError::Store("disk full".into())),
            _ => Ok(()),
        }
    }
}

impl SessionStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        self.check(key)?;
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), ChatError> {
        self.check(key)?;
        self.inner.remove(key)
    }
}

pub(crate) fn scripted_session(
    client: Arc<ScriptedClient>,
    store: Arc<dyn SessionStore>,
    clock: Arc<ManualClock>,
) -> (ChatSession, SessionStart) {
    SessionBuilder::new(client)
        .with_store(store)
        .with_clock(clock)
        .with_settings(SessionSettings::default())
        .initialize()
        .unwrap()
}

/// Yield until `session` reports a request in flight.
pub(crate) async fn wait_pending(session: &ChatSession) {
    for _ in 0..1_000 {
        if session.is_pending() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("session never became pending");
}
