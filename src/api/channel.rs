// src/api/channel.rs
// Transport channel: exactly one live WebSocket connection per active
// identity. Inbound frames are parsed into typed events by a reader task;
// outbound actions are serialized onto the shared sink.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::message::{InboundEvent, OutboundAction};

/// Inbound event queue depth. Frames past this apply backpressure to the
/// reader task rather than being dropped.
const EVENT_QUEUE_SIZE: usize = 100;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("failed to serialize outbound action: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to send frame: {0}")]
    Send(#[source] tokio_tungstenite::tungstenite::Error),
}

/// Connection state of the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

/// Lock-free state cell shared between the channel and its reader task
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: ChannelState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn set(&self, state: ChannelState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    fn get(&self) -> ChannelState {
        match self.0.load(Ordering::SeqCst) {
            0 => ChannelState::Connecting,
            1 => ChannelState::Open,
            _ => ChannelState::Closed,
        }
    }
}

/// One live bidirectional connection to the agent backend.
///
/// The channel never reconnects on its own: any transport failure or remote
/// close moves it to `Closed`, and recovery is the caller's decision
/// (typically a fresh identity switch).
pub struct AgentChannel {
    sender: Arc<Mutex<WsSink>>,
    events: mpsc::Receiver<InboundEvent>,
    state: Arc<StateCell>,
    reader: JoinHandle<()>,
}

impl AgentChannel {
    /// Connect to the agent at the given ws:// URL (identity encoded in the path)
    pub async fn connect(url: &str) -> Result<Self, ChannelError> {
        let state = Arc::new(StateCell::new(ChannelState::Connecting));

        let (ws_stream, _) = connect_async(url).await.map_err(|source| {
            state.set(ChannelState::Closed);
            ChannelError::Connect {
                url: url.to_string(),
                source,
            }
        })?;
        state.set(ChannelState::Open);
        info!("Channel open: {}", url);

        let (sender, mut receiver) = ws_stream.split();
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_SIZE);

        // Reader task: each frame becomes exactly one typed event or is dropped
        let reader_state = state.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = receiver.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<InboundEvent>(text.as_str()) {
                            Ok(event) => {
                                if event_tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Dropping malformed frame: {} - {}", e, text);
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Remote closed the channel");
                        break;
                    }
                    Ok(_) => {
                        // Binary, ping and pong frames are not part of the contract
                    }
                    Err(e) => {
                        warn!("Channel transport error: {}", e);
                        break;
                    }
                }
            }
            reader_state.set(ChannelState::Closed);
        });

        Ok(Self {
            sender: Arc::new(Mutex::new(sender)),
            events: event_rx,
            state,
            reader,
        })
    }

    /// Current connection state
    pub fn state(&self) -> ChannelState {
        self.state.get()
    }

    /// Serialize and transmit one outbound action.
    ///
    /// A no-op unless the channel is `Open`; the UI disables send affordances
    /// based on state, but the channel itself never throws or queues.
    pub async fn send(&self, action: &OutboundAction) -> Result<(), ChannelError> {
        if self.state.get() != ChannelState::Open {
            debug!("Dropping outbound action, channel is {:?}", self.state.get());
            return Ok(());
        }

        let json = serde_json::to_string(action)?;
        let mut sender = self.sender.lock().await;
        sender
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| {
                self.state.set(ChannelState::Closed);
                ChannelError::Send(e)
            })?;

        Ok(())
    }

    /// Next inbound event, in delivery order. `None` once the channel is
    /// closed and the queue is drained.
    pub async fn recv(&mut self) -> Option<InboundEvent> {
        self.events.recv().await
    }

    /// Non-blocking variant of `recv` for cooperative UI loops
    pub fn try_recv(&mut self) -> Option<InboundEvent> {
        self.events.try_recv().ok()
    }

    /// Release the connection. After this returns no further inbound events
    /// are delivered; frames already in flight are discarded.
    pub async fn close(&mut self) {
        self.reader.abort();
        self.state.set(ChannelState::Closed);

        // Best-effort close frame; the remote may already be gone
        let mut sender = self.sender.lock().await;
        if let Err(e) = sender.send(Message::Close(None)).await {
            debug!("Close frame not delivered: {}", e);
        }
        drop(sender);

        self.events.close();
        while self.events.try_recv().is_ok() {}
        debug!("Channel closed");
    }
}

impl Drop for AgentChannel {
    fn drop(&mut self) {
        self.reader.abort();
        self.state.set(ChannelState::Closed);
    }
}
