//! Plain-terminal rendering of conversation turns.

use askbox_chat::{render_markup, Message, Role};

/// Render one message, with numbered suggestions when it has any.
pub(crate) fn render_message(msg: &Message) -> String {
    let mut out = String::new();
    match (msg.role, msg.is_error) {
        (Role::User, _) => {
            out.push_str("you > ");
            out.push_str(&msg.content);
        }
        (Role::Assistant, true) => {
            out.push_str("bot ! ");
            out.push_str(&msg.content);
        }
        (Role::Assistant, false) => {
            out.push_str("bot > ");
            out.push_str(&render_markup(&msg.content).replace('\n', "\n      "));
        }
    }

    if msg.role == Role::Assistant && !msg.sources.is_empty() {
        out.push_str("\n  Sources");
        for source in msg.source_refs() {
            out.push_str(&format!(
                "\n    - {} ({})",
                source.display_name(),
                source.link_target()
            ));
        }
    }

    if msg.role == Role::Assistant && !msg.suggestions.is_empty() {
        out.push_str("\n  Suggestions");
        out.push_str(&render_shortcuts(&msg.suggestions));
    }
    out
}

/// Numbered `/N` list, one per line, each line prefixed with a newline.
pub(crate) fn render_shortcuts(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("\n    /{} {}", i + 1, item))
        .collect()
}
