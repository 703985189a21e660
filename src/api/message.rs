// src/api/message.rs
// Wire contract for the persistent channel. JSON frames tagged by "type".

use serde::{Deserialize, Serialize};

/// Who authored a timeline entry / inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
    System,
    Tool,
}

impl Default for Sender {
    // Inbound messages without an explicit sender come from the agent
    fn default() -> Self {
        Sender::Assistant
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Assistant => write!(f, "assistant"),
            Sender::System => write!(f, "system"),
            Sender::Tool => write!(f, "tool"),
        }
    }
}

/// Actions the client sends to the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundAction {
    #[serde(rename = "message")]
    Message { content: String },
    /// Request a server-side context reset for the active identity
    #[serde(rename = "forget")]
    Forget,
}

/// Events the agent pushes to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundEvent {
    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        sender: Sender,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    #[serde(rename = "typing")]
    Typing {
        #[serde(default = "default_typing")]
        typing: bool,
    },
    #[serde(rename = "tool")]
    Tool {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    /// Event kinds this client does not understand; dropped by the dispatcher
    #[serde(other)]
    Unknown,
}

fn default_typing() -> bool {
    true
}
