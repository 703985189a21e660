// src/api/mod.rs
// Client-side API surface: the persistent WebSocket channel plus the
// REST endpoints used for session/memory browsing.

pub mod channel;
pub mod message;
pub mod rest;

pub use channel::{AgentChannel, ChannelError, ChannelState};
pub use message::{InboundEvent, OutboundAction, Sender};
pub use rest::RestClient;
