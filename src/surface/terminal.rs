//! Line-oriented terminal surface

use super::RenderingSurface;
use crate::store::ConversationSnapshot;
use serde_json::Value;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
struct Painted {
    /// Store run the keys belong to
    run: u64,
    /// Keys of the messages already on screen, in order
    keys: Vec<String>,
    prompt_shown: bool,
}

/// Prints each new message once and marks retractions.
///
/// A terminal cannot erase what scrolled by, so a popped message is shown
/// as retracted instead.
#[derive(Default)]
pub struct TerminalSurface {
    painted: Mutex<Painted>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Text for one message body
pub fn format_body(body: &Value) -> String {
    let text = match body.get("text") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => body.to_string(),
    };
    match body.get("role").and_then(Value::as_str) {
        Some("user") => format!("  you > {text}"),
        Some(role) => format!("{role:>5} > {text}"),
        None => format!("      {text}"),
    }
}

impl Painted {
    /// Text to print to bring the screen up to `snapshot`
    fn catch_up(&mut self, snapshot: &ConversationSnapshot) -> String {
        let mut out = String::new();

        // Positional keys repeat across runs, so a restart is told apart by
        // the run counter, even when the empty transcript was never painted
        if snapshot.run != self.run {
            if !self.keys.is_empty() {
                out.push_str("------ conversation restarted ------\n");
            }
            self.keys.clear();
            self.run = snapshot.run;
        }
        while self.keys.len() > snapshot.messages.len() {
            self.keys.pop();
            out.push_str("      (message retracted)\n");
        }

        let shown = self.keys.len();
        for message in snapshot.messages.iter().skip(shown) {
            out.push_str(&format_body(&message.body));
            out.push('\n');
            self.keys.push(message.key.clone());
        }

        if snapshot.input_is_active && !self.prompt_shown {
            out.push_str("> ");
        }
        self.prompt_shown = snapshot.input_is_active;
        out
    }
}

impl RenderingSurface for TerminalSurface {
    fn paint(&self, snapshot: &ConversationSnapshot) {
        let text = self
            .painted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .catch_up(snapshot);
        if !text.is_empty() {
            let _ = write!(std::io::stdout().lock(), "{text}");
        }
    }

    fn scroll_to_bottom(&self) {
        let _ = std::io::stdout().flush();
    }
}
