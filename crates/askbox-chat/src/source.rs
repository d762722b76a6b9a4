//! Display helpers for citations and message markup.

use std::sync::OnceLock;

use regex::Regex;

/// Storage prefix the answering service puts on document identifiers.
pub const SOURCE_PREFIX: &str = "docs/";

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Strip one leading `docs/` from a source identifier for display.
pub fn display_name(source: &str) -> &str {
    source.strip_prefix(SOURCE_PREFIX).unwrap_or(source)
}

/// A citation as shown to the user: short name plus the untouched identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRef<'a> {
    id: &'a str,
}

impl<'a> SourceRef<'a> {
    pub fn new(id: &'a str) -> Self {
        Self { id }
    }

    pub fn display_name(&self) -> &'a str {
        display_name(self.id)
    }

    /// Identifier to use for any link target; never prefix-stripped.
    pub fn link_target(&self) -> &'a str {
        self.id
    }
}

fn bold_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"))
}

/// Render `**bold**` spans as ANSI bold for a terminal. Newlines are kept.
pub fn render_markup(content: &str) -> String {
    bold_pattern()
        .replace_all(content, format!("{BOLD}${{1}}{RESET}").as_str())
        .into_owned()
}
