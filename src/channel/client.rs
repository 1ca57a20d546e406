use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::identity::SessionIdentity;
use super::messages::{InboundMessage, OutboundMessage};
use super::transport::{Transport, TransportFrame};
use crate::error::{Result, SchedulerError};
use crate::events::{ChannelEvent, CloseReason, SessionEvent};

/// Connection state of the session channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Live link plus the task draining its inbound side
struct ActiveLink {
    outbound: mpsc::UnboundedSender<String>,
    shutdown: oneshot::Sender<()>,
    reader: JoinHandle<()>,
}

/// Lifecycle of one duplex connection to the agent
///
/// The channel is the only writer of `ConnectionState`. Transitions, inbound
/// frames and closes are posted to the coordinator queue.
pub struct SessionChannel {
    /// Transport used to open links
    transport: Box<dyn Transport>,

    /// Current connection state (shared with the reader task)
    state: Arc<watch::Sender<ConnectionState>>,

    /// Coordinator queue
    events: mpsc::UnboundedSender<SessionEvent>,

    /// Link of the current connection, if any
    link: Option<ActiveLink>,

    /// Number of the most recent connection attempt; tags every event
    generation: u64,
}

impl SessionChannel {
    pub fn new(transport: Box<dyn Transport>, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            transport,
            state: Arc::new(state),
            events,
            link: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Number of the current (or last) link
    ///
    /// Events tagged with an older number come from a connection that has
    /// since been replaced.
    pub fn link(&self) -> u64 {
        self.generation
    }

    /// Observe connection state transitions
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Open the channel for `identity`
    ///
    /// Disconnected → Connecting → Connected, or back to Disconnected with a
    /// `Connection` error if the transport cannot be opened. A no-op while
    /// already connecting or connected.
    pub async fn connect(&mut self, identity: &SessionIdentity) -> Result<()> {
        let current = self.state();
        if current != ConnectionState::Disconnected {
            warn!("Connect ignored: channel already {}", current);
            return Ok(());
        }

        // Reap a link left behind by an unexpected close
        self.release_link().await;

        self.generation += 1;
        let link_id = self.generation;
        let events = LinkEvents {
            link: link_id,
            events: self.events.clone(),
        };

        transition(&self.state, &events, ConnectionState::Connecting);
        info!(
            "Opening session channel {} via {}",
            identity,
            self.transport.name()
        );

        let link = match self.transport.open(identity).await {
            Ok(link) => link,
            Err(e) => {
                error!("Failed to open session channel: {:#}", e);
                transition(&self.state, &events, ConnectionState::Disconnected);
                return Err(SchedulerError::Connection(format!("{:#}", e)));
            }
        };

        // Connected before the reader starts, so an immediate close lands after it
        transition(&self.state, &events, ConnectionState::Connected);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let reader = tokio::spawn(read_inbound(
            link.inbound,
            shutdown_rx,
            Arc::clone(&self.state),
            events,
        ));

        self.link = Some(ActiveLink {
            outbound: link.outbound,
            shutdown: shutdown_tx,
            reader,
        });

        info!("Session channel {} connected (link {})", identity, link_id);

        Ok(())
    }

    /// Queue a frame for the agent
    ///
    /// Fails with `DiscardedSend` (and nothing goes on the wire) unless the
    /// channel is connected.
    pub fn send(&self, message: &OutboundMessage) -> Result<()> {
        let state = self.state();
        let link = match (&self.link, state) {
            (Some(link), ConnectionState::Connected) => link,
            _ => {
                warn!("Discarding {} frame: channel is {}", message.kind(), state);
                return Err(SchedulerError::DiscardedSend(state));
            }
        };

        let json =
            serde_json::to_string(message).map_err(|e| SchedulerError::Protocol(e.to_string()))?;

        if link.outbound.send(json).is_err() {
            warn!("Discarding {} frame: transport is gone", message.kind());
            return Err(SchedulerError::DiscardedSend(state));
        }

        debug!("Sent {} frame", message.kind());

        Ok(())
    }

    /// Close the channel
    ///
    /// Always ends Disconnected; calling it again is harmless. Emits
    /// `Closed(Requested)` only when a connection was actually torn down.
    pub async fn disconnect(&mut self) {
        self.release_link().await;

        if self.state() == ConnectionState::Disconnected {
            debug!("Disconnect: channel already closed");
            return;
        }

        let events = LinkEvents {
            link: self.generation,
            events: self.events.clone(),
        };
        transition(&self.state, &events, ConnectionState::Disconnected);
        events.emit(ChannelEvent::Closed(CloseReason::Requested));

        info!("Session channel disconnected");
    }

    /// Stop the reader task, then drop the outbound side so the transport closes
    async fn release_link(&mut self) {
        if let Some(ActiveLink {
            outbound,
            shutdown,
            reader,
        }) = self.link.take()
        {
            let _ = shutdown.send(());
            if let Err(e) = reader.await {
                error!("Session channel reader panicked: {}", e);
            }
            drop(outbound);
        }
    }
}

/// Coordinator queue sender that tags events with one link's number
struct LinkEvents {
    link: u64,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl LinkEvents {
    /// False once the coordinator queue is gone
    fn emit(&self, event: ChannelEvent) -> bool {
        self.events
            .send(SessionEvent::Channel {
                link: self.link,
                event,
            })
            .is_ok()
    }
}

/// Replace the state and announce it if it changed
fn transition(
    state: &watch::Sender<ConnectionState>,
    events: &LinkEvents,
    next: ConnectionState,
) {
    let previous = state.send_replace(next);
    if previous != next {
        debug!("Session channel {} -> {} (link {})", previous, next, events.link);
        events.emit(ChannelEvent::StateChanged(next));
    }
}

/// Forward inbound frames in arrival order until shutdown or transport close
async fn read_inbound(
    mut inbound: mpsc::UnboundedReceiver<TransportFrame>,
    mut shutdown: oneshot::Receiver<()>,
    state: Arc<watch::Sender<ConnectionState>>,
    events: LinkEvents,
) {
    let reason = loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => return,

            frame = inbound.recv() => match frame {
                Some(TransportFrame::Text(text)) => {
                    let event = match InboundMessage::parse(&text) {
                        Ok(message) => ChannelEvent::Inbound(message),
                        Err(e) => {
                            warn!("Ignoring inbound frame: {}", e);
                            ChannelEvent::ProtocolError(e.to_string())
                        }
                    };
                    if !events.emit(event) {
                        return;
                    }
                }
                Some(TransportFrame::Closed(reason)) => break reason,
                None => break "transport ended".to_string(),
            },
        }
    };

    warn!("Session channel link {} closed unexpectedly: {}", events.link, reason);
    transition(&state, &events, ConnectionState::Disconnected);
    events.emit(ChannelEvent::Closed(CloseReason::Unexpected(reason)));
}
