//! Terminal rendering for the chat and observer commands.

use std::io::Write;
use std::sync::Mutex;

use chrono::Local;
use uuid::Uuid;

use mentor_chat::PresenterView;
use mentor_core::types::{ChatMessage, Role};

const MENTOR_LABEL: &str = "mentor> ";

/// Streams the live-typed reply to stdout.
#[derive(Default)]
pub struct TerminalView {
    /// Message currently being typed and how many bytes of it are printed.
    cursor: Mutex<Option<(Uuid, usize)>>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresenterView for TerminalView {
    fn render_prefix(&self, message_id: Uuid, prefix: &str) {
        let mut cursor = self.cursor.lock().unwrap_or_else(|p| p.into_inner());
        let printed = match *cursor {
            Some((id, printed)) if id == message_id => printed,
            Some(_) => {
                // A newer reply interrupted the previous one.
                println!();
                print!("{}", MENTOR_LABEL);
                0
            }
            None => {
                print!("{}", MENTOR_LABEL);
                0
            }
        };
        if let Some(rest) = prefix.get(printed..) {
            print!("{}", rest);
        }
        *cursor = Some((message_id, prefix.len()));
    }

    fn scroll_to_latest(&self) {
        let _ = std::io::stdout().flush();
    }

    fn finalize(&self, message: &ChatMessage) {
        let mut cursor = self.cursor.lock().unwrap_or_else(|p| p.into_inner());
        match cursor.take() {
            Some((id, printed)) if id == message.id => {
                if let Some(rest) = message.content.get(printed..) {
                    print!("{}", rest);
                }
                println!();
            }
            _ => println!("{}{}", MENTOR_LABEL, message.content),
        }
    }
}

/// One conversation line with a local timestamp.
pub fn format_message(message: &ChatMessage) -> String {
    let who = match message.role {
        Role::Student => "grupo ",
        Role::Mentor => "mentor",
    };
    format!(
        "[{}] {}: {}",
        message.created_at.with_timezone(&Local).format("%H:%M:%S"),
        who,
        message.content
    )
}
