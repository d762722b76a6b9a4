//! REPL input parsing.

/// One line of user input, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Free text to send as a question (may be blank).
    Ask(String),
    /// `/N`: submit the N-th offered topic or suggestion (1-based).
    Pick(usize),
    Clear,
    /// Offer every known topic, not just the first few.
    Topics,
    History,
    Session,
    Help,
    Quit,
    Unknown(String),
}

pub(crate) fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Ask(line.to_string());
    };

    if let Ok(n) = rest.parse::<usize>() {
        return if n == 0 {
            Command::Unknown(trimmed.to_string())
        } else {
            Command::Pick(n)
        };
    }

    match rest.to_ascii_lowercase().as_str() {
        "clear" | "new" => Command::Clear,
        "topics" => Command::Topics,
        "history" => Command::History,
        "session" => Command::Session,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

pub(crate) const HELP: &str = "\
Type a question and press Enter.
  /1 .. /9   ask the numbered topic or suggestion
  /clear     start a new conversation
  /topics    list every suggested topic
  /history   show the conversation so far
  /session   show the current session id
  /quit      exit";
