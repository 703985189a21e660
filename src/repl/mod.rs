// src/repl/mod.rs
// Interactive terminal front end. Pure display glue over the core: it
// drains channel events into the timeline, routes key chords through the
// command router, and renders snapshots from the REST collaborators.

mod display;

pub use display::TerminalDisplay;

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::{event, terminal};
use tracing::debug;

use crate::api::channel::ChannelState;
use crate::api::message::Sender;
use crate::api::rest::RestClient;
use crate::commands::{route_key, Command, InputContext, SidebarTab};
use crate::config::CliConfig;
use crate::session::SessionStore;
use crate::timeline::Timeline;

/// How long the event loop waits for a key before draining channel events
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One-shot mode gives the agent this long to produce a reply
const ONE_SHOT_TIMEOUT: Duration = Duration::from_secs(120);

/// Quiet period after the reply before one-shot mode exits
const ONE_SHOT_SETTLE: Duration = Duration::from_millis(300);

/// How long one-shot mode absorbs the server's connect greeting before
/// sending, so the greeting is never mistaken for the reply
const GREETING_WINDOW: Duration = Duration::from_millis(250);

pub struct Repl {
    store: SessionStore,
    timeline: Timeline,
    rest: RestClient,
    display: TerminalDisplay,
    input: String,
    input_focused: bool,
    sidebar: Option<SidebarTab>,
    running: bool,
}

impl Repl {
    pub fn new(config: CliConfig, identity: String) -> Self {
        let store = SessionStore::new(&config.backend_url, &identity);
        let rest = RestClient::new(&config.http_url);
        let display = TerminalDisplay::new(config.no_color);

        Self {
            store,
            timeline: Timeline::new(),
            rest,
            display,
            input: String::new(),
            input_focused: true,
            sidebar: None,
            running: true,
        }
    }

    /// The applied entry sequence (one-shot callers inspect the outcome)
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Send one message, print the reply, exit. Used for `--message`.
    ///
    /// The server greets every fresh connection with an assistant message,
    /// so replies are only counted after the outbound send; while the
    /// typing flag is set the agent is still composing and the settle
    /// timer stays disarmed.
    pub async fn run_one_shot(&mut self, message: &str) -> Result<()> {
        self.store.reconnect(&mut self.timeline).await;
        if self.store.channel_state() != ChannelState::Open {
            self.display.print_error("Could not connect to the agent.");
            return Ok(());
        }

        self.absorb_greeting().await;

        if let Some(channel) = self.store.channel() {
            self.timeline.append_local(message, channel).await;
        }

        let deadline = tokio::time::Instant::now() + ONE_SHOT_TIMEOUT;
        let mut replied = false;
        loop {
            let settled = replied && !self.timeline.is_typing();
            let event = tokio::select! {
                event = self.store.next_event() => event,
                _ = tokio::time::sleep(ONE_SHOT_SETTLE), if settled => break,
                _ = tokio::time::sleep_until(deadline) => {
                    self.display.print_error("Timed out waiting for a reply.");
                    break;
                }
            };
            let Some(event) = event else { break };

            let before = self.timeline.len();
            self.timeline.on_remote_event(event);
            for entry in &self.timeline.entries()[before..] {
                if entry.sender != Sender::User {
                    self.display.print_entry(entry);
                    replied = true;
                }
            }
        }

        self.store.close().await;
        Ok(())
    }

    /// Apply and print whatever arrives right after connect (the greeting)
    /// without counting it toward the reply
    async fn absorb_greeting(&mut self) {
        let window = tokio::time::Instant::now() + GREETING_WINDOW;
        loop {
            let event = tokio::select! {
                event = self.store.next_event() => event,
                _ = tokio::time::sleep_until(window) => break,
            };
            let Some(event) = event else { break };

            let before = self.timeline.len();
            self.timeline.on_remote_event(event);
            for entry in &self.timeline.entries()[before..] {
                self.display.print_entry(entry);
            }
        }
    }

    /// Interactive loop: single-threaded and cooperative, all state
    /// mutation happens inline between polls.
    pub async fn run(&mut self) -> Result<()> {
        self.store.reconnect(&mut self.timeline).await;
        self.display
            .print_welcome(self.store.identity(), self.store.channel_state());

        terminal::enable_raw_mode()?;
        let result = self.event_loop().await;
        terminal::disable_raw_mode()?;

        self.store.close().await;
        result
    }

    async fn event_loop(&mut self) -> Result<()> {
        while self.running {
            self.drain_channel_events();

            if event::poll(POLL_INTERVAL)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key).await?;
                }
            } else {
                // Yield so the channel reader task can make progress
                tokio::task::yield_now().await;
            }
        }
        Ok(())
    }

    /// Apply pending channel events to the timeline and render the delta
    fn drain_channel_events(&mut self) {
        while let Some(event) = self.store.try_next_event() {
            let before = self.timeline.len();
            let was_typing = self.timeline.is_typing();
            self.timeline.on_remote_event(event);

            for entry in &self.timeline.entries()[before..] {
                self.display.print_entry(entry);
            }
            if self.timeline.is_typing() && !was_typing {
                self.display.print_typing(true);
            }
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Ctrl+C / Ctrl+D always exit
        if key.modifiers == KeyModifiers::CONTROL
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('d'))
        {
            self.running = false;
            return Ok(());
        }

        let ctx = InputContext {
            input_focused: self.input_focused,
            channel_open: self.store.channel_state() == ChannelState::Open,
        };

        match route_key(&key, &ctx) {
            Some(Command::SubmitMessage) => {
                print!("\r\n");
                let line = std::mem::take(&mut self.input);
                self.handle_line(line.trim()).await?;
            }
            Some(Command::InsertNewline) => {
                self.input.push('\n');
                print!("\r\n");
            }
            Some(Command::FocusInput) => {
                self.input_focused = true;
                if let KeyCode::Char(c) = key.code {
                    self.input.push(c);
                    print!("{}", c);
                }
            }
            Some(Command::ToggleSidebar) => {
                if self.sidebar.is_some() {
                    self.sidebar = None;
                } else {
                    self.open_sidebar(SidebarTab::Sessions).await;
                }
            }
            Some(Command::OpenSidebar(tab)) => {
                self.open_sidebar(tab).await;
            }
            Some(Command::NewSession) => {
                let identity = self.store.create_new(None, &mut self.timeline).await;
                self.display.print_info(&format!("New session: {}", identity));
                self.display
                    .print_status_line(self.store.identity(), self.store.channel_state());
            }
            None => self.edit_input(&key),
        }

        use std::io::Write;
        let _ = std::io::stdout().flush();
        Ok(())
    }

    /// Plain editing keys that are not router commands
    fn edit_input(&mut self, key: &KeyEvent) {
        if !self.input_focused {
            return;
        }
        match key.code {
            KeyCode::Char(c)
                if key.modifiers == KeyModifiers::NONE
                    || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.input.push(c);
                print!("{}", c);
            }
            KeyCode::Backspace => {
                if self.input.pop().is_some() {
                    print!("\u{8} \u{8}");
                }
            }
            KeyCode::Esc => {
                self.input_focused = false;
            }
            _ => {}
        }
    }

    async fn open_sidebar(&mut self, tab: SidebarTab) {
        self.sidebar = Some(tab);
        match tab {
            SidebarTab::Sessions => {
                let identity = self.store.identity().to_string();
                let sessions = self.rest.list_sessions(&identity).await;
                self.display.print_info(&format!("Sessions for {}:", identity));
                self.display.print_sessions(&sessions);
            }
            SidebarTab::Memories => {
                let identity = self.store.identity().to_string();
                let memories = self.rest.list_memories(&identity).await;
                self.display.print_info(&format!("Memories for {}:", identity));
                self.display.print_memories(&memories);
            }
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result<()> {
        if line.is_empty() {
            return Ok(());
        }
        if line.starts_with('/') {
            return self.handle_command(line).await;
        }

        match self.store.channel() {
            Some(channel) => {
                if self.timeline.append_local(line, channel).await {
                    self.display.print_typing(true);
                } else {
                    self.display.print_error("Not connected; message not sent.");
                }
            }
            None => {
                self.display
                    .print_error("Not connected; use /switch or /new to reconnect.");
            }
        }
        Ok(())
    }

    async fn handle_command(&mut self, line: &str) -> Result<()> {
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or("");
        let arg = parts.next();

        match command {
            "/help" => self.display.print_help(),
            "/quit" | "/exit" => self.running = false,
            "/status" => {
                self.display
                    .print_status_line(self.store.identity(), self.store.channel_state());
            }
            "/switch" => match arg {
                Some(identity) => {
                    self.store.switch_to(identity, &mut self.timeline).await;
                    self.display
                        .print_status_line(self.store.identity(), self.store.channel_state());
                }
                None => {
                    let summaries = self.rest.list_identities().await;
                    self.display.print_info("Known identities:");
                    self.display.print_identities(&summaries);
                }
            },
            "/new" => {
                let identity = self.store.create_new(arg, &mut self.timeline).await;
                self.display.print_info(&format!("New session: {}", identity));
                self.display
                    .print_status_line(self.store.identity(), self.store.channel_state());
            }
            "/forget" => {
                self.timeline.forget(self.store.channel()).await;
                self.display.print_info("Conversation cleared.");
            }
            "/sessions" => {
                let identity = arg.unwrap_or(self.store.identity()).to_string();
                let sessions = self.rest.list_sessions(&identity).await;
                self.display.print_sessions(&sessions);
            }
            "/messages" => match arg {
                Some(session_id) => {
                    let identity = self.store.identity().to_string();
                    let messages = self.rest.list_messages(&identity, session_id).await;
                    self.display.print_messages(&messages);
                }
                None => self.display.print_error("Usage: /messages <session>"),
            },
            "/session-rm" => match arg {
                Some(session_id) => {
                    let identity = self.store.identity().to_string();
                    if self.rest.delete_session(&identity, session_id).await {
                        self.display.print_info("Session deleted.");
                    } else {
                        self.display.print_error("Could not delete session.");
                    }
                }
                None => self.display.print_error("Usage: /session-rm <session>"),
            },
            "/memories" => {
                let identity = self.store.identity().to_string();
                let memories = self.rest.list_memories(&identity).await;
                self.display.print_memories(&memories);
            }
            "/memory-rm" => match arg {
                Some(memory_id) => {
                    let identity = self.store.identity().to_string();
                    if self.rest.delete_memory(&identity, memory_id).await {
                        self.display.print_info("Memory deleted.");
                    } else {
                        self.display.print_error("Could not delete memory.");
                    }
                }
                None => self.display.print_error("Usage: /memory-rm <id>"),
            },
            other => {
                debug!("Unknown command: {}", other);
                self.display
                    .print_error(&format!("Unknown command: {} (try /help)", other));
            }
        }
        Ok(())
    }
}
