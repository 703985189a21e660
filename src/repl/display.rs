// src/repl/display.rs
// Terminal output helpers. Raw mode is line-disciplined by hand, so every
// write ends with an explicit \r\n.

use std::io::Write;

use console::style;

use crate::api::channel::ChannelState;
use crate::api::message::Sender;
use crate::api::rest::{MemoryRecord, MessageRecord, SessionDetail, SessionSummary};
use crate::timeline::TimelineEntry;

pub struct TerminalDisplay {
    colors: bool,
}

impl TerminalDisplay {
    pub fn new(no_color: bool) -> Self {
        Self { colors: !no_color }
    }

    fn line(&self, text: &str) {
        print!("{}\r\n", text);
        let _ = std::io::stdout().flush();
    }

    pub fn print_welcome(&self, identity: &str, state: ChannelState) {
        let banner = format!("hal-chat v{}", env!("CARGO_PKG_VERSION"));
        if self.colors {
            self.line(&style(&banner).bold().to_string());
        } else {
            self.line(&banner);
        }
        self.print_status_line(identity, state);
        self.line("Type a message, or /help for commands.");
        self.line("");
    }

    pub fn print_status_line(&self, identity: &str, state: ChannelState) {
        let indicator = match state {
            ChannelState::Open => "connected",
            ChannelState::Connecting => "connecting",
            ChannelState::Closed => "disconnected",
        };
        let text = format!("[{}] {}", identity, indicator);
        if self.colors {
            let styled = match state {
                ChannelState::Open => style(text).green(),
                ChannelState::Connecting => style(text).yellow(),
                ChannelState::Closed => style(text).red(),
            };
            self.line(&styled.to_string());
        } else {
            self.line(&text);
        }
    }

    pub fn print_entry(&self, entry: &TimelineEntry) {
        let label = entry.sender.to_string();
        if self.colors {
            let styled = match entry.sender {
                Sender::User => style(label).cyan().bold(),
                Sender::Assistant => style(label).green().bold(),
                Sender::System => style(label).yellow().bold(),
                Sender::Tool => style(label).magenta(),
            };
            self.line(&format!("{}: {}", styled, entry.content));
        } else {
            self.line(&format!("{}: {}", label, entry.content));
        }
    }

    pub fn print_typing(&self, typing: bool) {
        if typing {
            let text = "assistant is typing...";
            if self.colors {
                self.line(&style(text).dim().to_string());
            } else {
                self.line(text);
            }
        }
    }

    pub fn print_info(&self, message: &str) {
        if self.colors {
            self.line(&style(message).dim().to_string());
        } else {
            self.line(message);
        }
    }

    pub fn print_error(&self, message: &str) {
        if self.colors {
            self.line(&style(message).red().to_string());
        } else {
            self.line(message);
        }
    }

    pub fn print_identities(&self, summaries: &[SessionSummary]) {
        if summaries.is_empty() {
            self.print_info("No sessions found.");
            return;
        }
        for summary in summaries {
            self.line(&format!(
                "  {} ({} sessions, last: {})",
                summary.user_id, summary.session_count, summary.last_update
            ));
        }
    }

    pub fn print_sessions(&self, sessions: &[SessionDetail]) {
        if sessions.is_empty() {
            self.print_info("No sessions found.");
            return;
        }
        for session in sessions {
            self.line(&format!(
                "  {}  {} messages, updated {}",
                session.id, session.message_count, session.update_time
            ));
        }
    }

    pub fn print_messages(&self, messages: &[MessageRecord]) {
        if messages.is_empty() {
            self.print_info("No messages in this session.");
            return;
        }
        for message in messages {
            let text = message.text.as_deref().unwrap_or("");
            if message.is_tool_call {
                let tool = message.tool_name.as_deref().unwrap_or("unknown");
                self.line(&format!("  [{}] tool call: {}", message.timestamp, tool));
            } else {
                self.line(&format!("  [{}] {}: {}", message.timestamp, message.author, text));
            }
        }
    }

    pub fn print_memories(&self, memories: &[MemoryRecord]) {
        if memories.is_empty() {
            self.print_info("No memories stored.");
            return;
        }
        for memory in memories {
            let tags = if memory.tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", memory.tags.join(", "))
            };
            self.line(&format!("  {}  {}{}", memory.id, memory.content, tags));
        }
    }

    pub fn print_help(&self) {
        self.line("Commands:");
        self.line("  /switch <identity>     switch to another identity");
        self.line("  /new [identity]        start a fresh session identity");
        self.line("  /forget                clear the conversation (here and server-side)");
        self.line("  /sessions [identity]   list stored sessions");
        self.line("  /messages <session>    show a stored session's messages");
        self.line("  /session-rm <session>  delete a stored session");
        self.line("  /memories              list stored memories");
        self.line("  /memory-rm <id>        delete a stored memory");
        self.line("  /status                show identity and connection state");
        self.line("  /quit                  exit");
        self.line("Keys: Ctrl+B sidebar, Ctrl+S sessions, Ctrl+E memories, Ctrl+N new session");
    }
}
