// src/timeline/mod.rs
// Append-only message timeline plus the transient typing flag. Mutated
// only by channel events and local send actions; never reordered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::channel::{AgentChannel, ChannelState};
use crate::api::message::{InboundEvent, OutboundAction, Sender};

/// One immutable chat entry. Ids are generated client-side and carry no
/// relation to any backend-assigned identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl TimelineEntry {
    fn new(sender: Sender, content: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            content,
            timestamp,
        }
    }
}

/// Ordered entry sequence for the active identity
#[derive(Debug, Default)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
    typing: bool,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the remote party is currently composing a reply
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Record a user-submitted message and hand it to the channel.
    ///
    /// The local entry is appended before the outbound send so the user's
    /// own message is always visible ahead of any reply, regardless of
    /// network latency. Returns false (and does nothing) when the content
    /// is empty after trimming or the channel is not open.
    pub async fn append_local(&mut self, content: &str, channel: &AgentChannel) -> bool {
        let content = content.trim();
        if content.is_empty() {
            return false;
        }
        if channel.state() != ChannelState::Open {
            debug!("Ignoring message submission, channel is not open");
            return false;
        }

        self.entries
            .push(TimelineEntry::new(Sender::User, content.to_string(), Utc::now()));

        if let Err(e) = channel
            .send(&OutboundAction::Message {
                content: content.to_string(),
            })
            .await
        {
            warn!("Failed to send message: {}", e);
        }

        // A reply is expected either way
        self.typing = true;
        true
    }

    /// Apply one inbound channel event, in delivery order
    pub fn on_remote_event(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Message {
                sender,
                content,
                timestamp,
            } => {
                self.entries
                    .push(TimelineEntry::new(sender, content, parse_timestamp(timestamp)));
                self.typing = false;
            }
            InboundEvent::Typing { typing } => {
                self.typing = typing;
            }
            InboundEvent::Tool { content, timestamp } => {
                self.entries.push(TimelineEntry::new(
                    Sender::Tool,
                    content,
                    parse_timestamp(timestamp),
                ));
            }
            InboundEvent::Unknown => {
                debug!("Ignoring unknown event kind");
            }
        }
    }

    /// Empty the entry sequence and reset the typing flag
    pub fn clear(&mut self) {
        self.entries.clear();
        self.typing = false;
    }

    /// Ask the server to discard its context for the active identity, then
    /// clear the local view unconditionally. The local side never keeps a
    /// conversation the server claims to have forgotten.
    pub async fn forget(&mut self, channel: Option<&AgentChannel>) {
        if let Some(channel) = channel {
            if let Err(e) = channel.send(&OutboundAction::Forget).await {
                warn!("Forget request not delivered: {}", e);
            }
        }
        self.clear();
    }
}

/// Backend timestamps arrive as ISO-8601 strings; anything unparseable
/// falls back to the arrival instant.
fn parse_timestamp(raw: Option<String>) -> DateTime<Utc> {
    raw.as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}
