// src/lib.rs

pub mod api;
pub mod commands;
pub mod config;
pub mod repl;
pub mod session;
pub mod timeline;

// Re-export commonly used items
pub use api::channel::{AgentChannel, ChannelState};
pub use api::message::{InboundEvent, OutboundAction, Sender};
pub use api::rest::RestClient;
pub use commands::{route_key, Command, InputContext, SidebarTab};
pub use config::CliConfig;
pub use session::SessionStore;
pub use timeline::{Timeline, TimelineEntry};
