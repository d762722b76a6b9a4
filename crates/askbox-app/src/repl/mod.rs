//! Interactive terminal front end driving a `ChatSession`.

mod command;
mod render;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use askbox_chat::{
    AnswerClient, AnswerClientConfig, ChatError, ChatSession, FileStore, HttpAnswerClient,
    MemoryStore, SessionSettings, SessionStart, SessionStore, SubmitOutcome, TopicSuggestions,
    TopicsClient,
};
use askbox_common::{AskboxError, ExpiryTrigger, ResetReason, SessionEvent, SessionId};
use askbox_config::{AskboxConfig, StoreKind};
use tokio::io::AsyncBufReadExt;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::cli::Args;
use command::{parse_command, Command, HELP};
use render::{render_message, render_shortcuts};

const EXPIRED_NOTICE: &str = "(session expired after inactivity; starting a new conversation)";

/// What the loop should do after a line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Exit,
}

pub(crate) struct Repl<W: Write> {
    session: ChatSession,
    topics: TopicSuggestions,
    /// Prompts currently reachable as `/N`.
    shortcuts: Vec<String>,
    known_session: SessionId,
    out: W,
}

impl<W: Write> Repl<W> {
    pub(crate) fn new(session: ChatSession, topics: TopicSuggestions, out: W) -> Self {
        let shortcuts = topics.compact().to_vec();
        let known_session = session.session_id();
        Self {
            session,
            topics,
            shortcuts,
            known_session,
            out,
        }
    }

    pub(crate) fn greet(&mut self, start: &SessionStart) -> Result<(), AskboxError> {
        if start.resumed && start.restored_messages > 0 {
            writeln!(
                self.out,
                "Resumed conversation ({} messages). /history to review, /clear to start over.",
                start.restored_messages
            )?;
        } else {
            writeln!(self.out, "Ask me anything. /help for commands.")?;
            self.show_topics()?;
        }
        Ok(())
    }

    fn show_topics(&mut self) -> Result<(), AskboxError> {
        self.offer(self.topics.compact().to_vec())
    }

    fn show_all_topics(&mut self) -> Result<(), AskboxError> {
        self.offer(self.topics.prompts.clone())
    }

    fn offer(&mut self, prompts: Vec<String>) -> Result<(), AskboxError> {
        self.shortcuts = prompts;
        if !self.shortcuts.is_empty() {
            writeln!(self.out, "  Try{}", render_shortcuts(&self.shortcuts))?;
        }
        Ok(())
    }

    /// Handle one line of input. Session store failures are reported and
    /// the loop carries on; only terminal I/O errors are returned.
    pub(crate) async fn handle_line(&mut self, line: &str) -> Result<Flow, AskboxError> {
        // Typing again counts as the interface regaining attention.
        match self.session.handle_visible() {
            Ok(Some(_)) => writeln!(self.out, "{EXPIRED_NOTICE}")?,
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Expiry check failed");
                writeln!(self.out, "(could not check the session: {e})")?;
            }
        }
        let current = self.session.session_id();
        if current != self.known_session {
            self.known_session = current;
            self.shortcuts = self.topics.compact().to_vec();
        }

        match parse_command(line) {
            Command::Quit => return Ok(Flow::Exit),
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Clear => match self.session.clear() {
                Ok(new_id) => {
                    self.known_session = new_id;
                    writeln!(self.out, "Conversation cleared.")?;
                    self.show_topics()?;
                }
                Err(e) => {
                    warn!(error = %e, "Clear failed");
                    writeln!(self.out, "Could not clear the conversation: {e}")?;
                }
            },
            Command::Topics => self.show_all_topics()?,
            Command::History => {
                let messages = self.session.messages();
                if messages.is_empty() {
                    writeln!(self.out, "(no messages yet)")?;
                }
                for msg in &messages {
                    writeln!(self.out, "{}", render_message(msg))?;
                }
            }
            Command::Session => writeln!(self.out, "session: {}", self.session.session_id())?,
            Command::Pick(n) => match self.shortcuts.get(n - 1).cloned() {
                Some(prompt) => {
                    writeln!(self.out, "you > {prompt}")?;
                    self.ask(&prompt).await?;
                }
                None => writeln!(self.out, "No shortcut /{n} right now.")?,
            },
            Command::Ask(text) => self.ask(&text).await?,
            Command::Unknown(cmd) => writeln!(self.out, "Unknown command {cmd}. /help for help.")?,
        }
        Ok(Flow::Continue)
    }

    async fn ask(&mut self, text: &str) -> Result<(), AskboxError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        self.session.set_draft(text);
        writeln!(self.out, "  ...")?;
        self.out.flush()?;

        match self.session.submit(text).await {
            Ok(SubmitOutcome::Ignored) => {}
            Ok(SubmitOutcome::Completed(reply)) => {
                writeln!(self.out, "{}", render_message(&reply))?;
                if !reply.suggestions.is_empty() {
                    self.shortcuts = reply.suggestions;
                }
            }
            Ok(SubmitOutcome::Discarded) => {
                writeln!(self.out, "(reply dropped: the conversation was reset)")?;
            }
            Err(ChatError::Busy) => {
                writeln!(self.out, "Still waiting for the previous answer.")?;
            }
            Err(e) => {
                warn!(error = %e, "Submit failed");
                writeln!(self.out, "Could not send the question: {e}")?;
            }
        }
        Ok(())
    }

    /// Read lines from stdin until EOF or `/quit`.
    pub(crate) async fn run_loop(&mut self) -> Result<(), AskboxError> {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        loop {
            write!(self.out, "> ")?;
            self.out.flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            if self.handle_line(&line).await? == Flow::Exit {
                break;
            }
        }
        Ok(())
    }
}

/// Print a notice when the background watcher expires the session.
fn spawn_notice_task(mut rx: broadcast::Receiver<SessionEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(SessionEvent::Reset {
                    reason:
                        ResetReason::Inactive {
                            trigger: ExpiryTrigger::Tick,
                        },
                    ..
                }) => {
                    println!("\n{EXPIRED_NOTICE}");
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Session event listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn build_store(config: &AskboxConfig, args: &Args) -> Result<Arc<dyn SessionStore>, AskboxError> {
    if args.memory || config.session.store == StoreKind::Memory {
        info!("Using in-memory session store");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let path = match &config.session.store_path {
        Some(path) => path.clone(),
        None => FileStore::default_path()?,
    };
    info!(path = %path.display(), "Using file session store");
    Ok(Arc::new(FileStore::new(path)))
}

fn session_settings(config: &AskboxConfig) -> SessionSettings {
    SessionSettings {
        inactivity_timeout: Duration::from_secs(config.session.inactivity_timeout_secs.into()),
        check_interval: Duration::from_secs(config.session.check_interval_secs.into()),
        error_message: config.session.error_message.clone(),
    }
}

/// Start a session on `store`. If the store cannot be written, keep going
/// with an in-memory session rather than refusing to start.
fn start_session(
    client: Arc<dyn AnswerClient>,
    store: Arc<dyn SessionStore>,
    settings: SessionSettings,
) -> Result<(ChatSession, SessionStart), AskboxError> {
    let started = ChatSession::builder(Arc::clone(&client))
        .with_store(store)
        .with_settings(settings.clone())
        .initialize();
    match started {
        Ok(started) => Ok(started),
        Err(e) => {
            warn!(error = %e, "Session store unavailable, continuing without persistence");
            Ok(ChatSession::builder(client)
                .with_settings(settings)
                .initialize()?)
        }
    }
}

/// Build the session from config and run either one question or the REPL.
pub(crate) async fn run(config: AskboxConfig, args: Args) -> Result<(), AskboxError> {
    let store = build_store(&config, &args)?;
    let client = HttpAnswerClient::new(
        AnswerClientConfig::new(&config.api.answer_url).with_request_timeout(Duration::from_secs(
            config.api.request_timeout_secs.into(),
        )),
    )?;

    let (session, start) = start_session(Arc::new(client), store, session_settings(&config))?;
    info!(session_id = %start.session_id, resumed = start.resumed, "Session ready");

    if let Some(question) = args.ask.as_deref() {
        let mut repl = Repl::new(session, TopicSuggestions::defaults(None), std::io::stdout());
        repl.ask(question).await?;
        return Ok(());
    }

    let topics = TopicsClient::new(&config.api.topics_url)?
        .load_suggestions()
        .await;
    if let Some(ref err) = topics.error {
        warn!("{err}");
    }

    let watcher = session.spawn_expiry_watcher();
    let notices = spawn_notice_task(session.subscribe());

    let mut repl = Repl::new(session, topics, std::io::stdout());
    repl.greet(&start)?;
    let result = repl.run_loop().await;

    watcher.shutdown().await;
    notices.abort();
    result
}
