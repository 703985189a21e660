// src/commands/mod.rs
// Keyboard/command router: a pure mapping from global key chords to
// high-level actions, guarded only by focus and connection state.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Sidebar tabs the chords can jump to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarTab {
    Sessions,
    Memories,
}

/// High-level actions produced by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleSidebar,
    OpenSidebar(SidebarTab),
    NewSession,
    FocusInput,
    SubmitMessage,
    InsertNewline,
}

/// The state the router is allowed to consult
#[derive(Debug, Clone, Copy)]
pub struct InputContext {
    /// Whether a text field currently has focus
    pub input_focused: bool,
    /// Whether the channel is open (gates submission)
    pub channel_open: bool,
}

/// Map one key event to a command, or `None` when the chord means nothing
/// in the current context. Stateless; no retry or failure semantics.
pub fn route_key(key: &KeyEvent, ctx: &InputContext) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('b'), KeyModifiers::CONTROL) => Some(Command::ToggleSidebar),
        (KeyCode::Char('s'), KeyModifiers::CONTROL) => {
            Some(Command::OpenSidebar(SidebarTab::Sessions))
        }
        (KeyCode::Char('e'), KeyModifiers::CONTROL) => {
            Some(Command::OpenSidebar(SidebarTab::Memories))
        }
        (KeyCode::Char('n'), KeyModifiers::CONTROL) => Some(Command::NewSession),
        (KeyCode::Enter, KeyModifiers::SHIFT) if ctx.input_focused => {
            Some(Command::InsertNewline)
        }
        (KeyCode::Enter, KeyModifiers::NONE) if ctx.input_focused && ctx.channel_open => {
            Some(Command::SubmitMessage)
        }
        (KeyCode::Char(_), KeyModifiers::NONE | KeyModifiers::SHIFT)
            if !ctx.input_focused =>
        {
            Some(Command::FocusInput)
        }
        _ => None,
    }
}
