//! Submitting a question and recording the reply.

use askbox_common::SessionEvent;
use tracing::{debug, info, warn};

use crate::{AskRequest, ChatError, Message};

use super::manager::ChatSession;
use super::types::{PendingGuard, SubmitOutcome};

impl ChatSession {
    /// Send `text` to the answering service as the next user turn.
    ///
    /// Blank input is ignored. A submit while another is pending fails with
    /// `ChatError::Busy` and changes nothing; that is the only `Err`.
    /// Request failures become an assistant message with `is_error` set.
    /// Store write failures are logged and the turn still completes.
    pub async fn submit(&self, text: &str) -> Result<SubmitOutcome, ChatError> {
        if text.trim().is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }

        let guard = PendingGuard::acquire(&self.inner.pending, &self.inner.events)?;

        let (session_id, index) = {
            let mut state = self.inner.lock_state();
            let now = self.inner.clock.now_millis();
            if let Err(e) = self.inner.persist_activity(now) {
                warn!(session_id = %state.session_id, error = %e, "Failed to persist activity");
            }
            state.last_activity_at = now;

            state.messages.push(Message::user(text));
            if let Err(e) = self.inner.persist_messages(&state.messages) {
                warn!(session_id = %state.session_id, error = %e, "Failed to persist history");
            }
            state.draft.clear();
            (state.session_id.clone(), state.messages.len() - 1)
        };
        self.inner.events.publish(SessionEvent::MessageAppended {
            session_id: session_id.to_string(),
            index,
        });

        let request = AskRequest::new(text, session_id.as_str());
        debug!(session_id = %session_id, "Submitting question");

        let reply = match self.inner.client.ask(&request).await {
            Ok(response) => Message::assistant(response),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Answer request failed");
                Message::error(self.inner.settings.error_message.clone())
            }
        };

        let appended = {
            let mut state = self.inner.lock_state();
            if state.session_id != session_id {
                None
            } else {
                state.messages.push(reply.clone());
                if let Err(e) = self.inner.persist_messages(&state.messages) {
                    warn!(session_id = %session_id, error = %e, "Failed to persist history");
                }
                Some(state.messages.len() - 1)
            }
        };

        let outcome = match appended {
            Some(index) => {
                self.inner.events.publish(SessionEvent::MessageAppended {
                    session_id: session_id.to_string(),
                    index,
                });
                SubmitOutcome::Completed(reply)
            }
            None => {
                info!(
                    session_id = %session_id,
                    "Session replaced while request was in flight, reply discarded"
                );
                SubmitOutcome::Discarded
            }
        };

        drop(guard);
        self.inner.events.publish(SessionEvent::FocusRequested);
        Ok(outcome)
    }
}
