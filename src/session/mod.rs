// src/session/mod.rs
// Session identity store: owns the single active identity and the channel
// connected for it, and orchestrates identity switches.

use std::time::Duration;

use rand::distr::{Alphanumeric, SampleString};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::api::channel::{AgentChannel, ChannelState};
use crate::api::message::InboundEvent;
use crate::timeline::Timeline;

/// Length of the random suffix on generated identities
const IDENTITY_SUFFIX_LEN: usize = 8;

/// How long a dial may stall before a switch gives up. A server that
/// accepts TCP but never answers the upgrade would otherwise hang the
/// caller indefinitely.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Derive a fresh identity. The suffix is a casual session label from a
/// non-cryptographic generator, not an authentication token.
pub fn generate_identity() -> String {
    let suffix = Alphanumeric
        .sample_string(&mut rand::rng(), IDENTITY_SUFFIX_LEN)
        .to_lowercase();
    format!("web_{}", suffix)
}

/// Owns the active identity and its channel. At most one channel is alive
/// at any instant; switching tears the old one down before the new one is
/// opened, so events from a replaced identity can never cross over.
pub struct SessionStore {
    ws_base_url: String,
    active: String,
    known: Vec<String>,
    channel: Option<AgentChannel>,
}

impl SessionStore {
    /// Create a store for the given identity. No channel is opened yet;
    /// call `switch_to` (or `reconnect`) to establish one.
    pub fn new(ws_base_url: &str, identity: &str) -> Self {
        Self {
            ws_base_url: ws_base_url.trim_end_matches('/').to_string(),
            active: identity.to_string(),
            known: vec![identity.to_string()],
            channel: None,
        }
    }

    /// The active identity
    pub fn identity(&self) -> &str {
        &self.active
    }

    /// Identities this store has connected as, most recent last
    pub fn known_identities(&self) -> &[String] {
        &self.known
    }

    /// Connection state of the owned channel (`Closed` when none exists)
    pub fn channel_state(&self) -> ChannelState {
        self.channel
            .as_ref()
            .map(|c| c.state())
            .unwrap_or(ChannelState::Closed)
    }

    pub fn channel(&self) -> Option<&AgentChannel> {
        self.channel.as_ref()
    }

    /// Switch the active identity: close the current channel, clear the
    /// timeline, set the identity, open a new channel. Re-asserting the
    /// current identity performs the same full reset, never a no-op.
    ///
    /// A failed connect leaves the store consistent with `channel_state()`
    /// reporting `Closed`; recovery is a fresh user-initiated switch.
    pub async fn switch_to(&mut self, identity: &str, timeline: &mut Timeline) {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
        timeline.clear();

        self.active = identity.to_string();
        if !self.known.iter().any(|known| known == identity) {
            self.known.push(identity.to_string());
        }

        match timeout(CONNECT_TIMEOUT, AgentChannel::connect(&self.endpoint())).await {
            Ok(Ok(channel)) => {
                info!("Switched to identity {}", identity);
                self.channel = Some(channel);
            }
            Ok(Err(e)) => {
                warn!("Could not connect for identity {}: {}", identity, e);
            }
            Err(_) => {
                warn!(
                    "Handshake stalled for identity {}, giving up after {:?}",
                    identity, CONNECT_TIMEOUT
                );
            }
        }
    }

    /// Derive a fresh identity (the preferred one if non-empty after
    /// trimming, else a generated one) and switch to it.
    pub async fn create_new(&mut self, preferred: Option<&str>, timeline: &mut Timeline) -> String {
        let identity = match preferred.map(str::trim).filter(|p| !p.is_empty()) {
            Some(preferred) => preferred.to_string(),
            None => generate_identity(),
        };
        self.switch_to(&identity, timeline).await;
        identity
    }

    /// Re-open the channel for the active identity (initial mount or
    /// user-initiated recovery). Equivalent to a switch to the same value.
    pub async fn reconnect(&mut self, timeline: &mut Timeline) {
        let identity = self.active.clone();
        self.switch_to(&identity, timeline).await;
    }

    /// Next inbound event from the owned channel, if any is pending
    pub fn try_next_event(&mut self) -> Option<InboundEvent> {
        self.channel.as_mut()?.try_recv()
    }

    /// Await the next inbound event. `None` when there is no channel or it
    /// has closed and drained.
    pub async fn next_event(&mut self) -> Option<InboundEvent> {
        self.channel.as_mut()?.recv().await
    }

    /// Tear down the channel without switching identity (unmount)
    pub async fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/ws/{}", self.ws_base_url, self.active)
    }
}
