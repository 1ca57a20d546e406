//! Deterministic test doubles for the transport and speech engines
//!
//! - `MockTransport` / `MockRemote`: in-memory agent link; the remote side
//!   pushes frames, drops the connection and inspects what the client sent
//! - `ScriptedRecognizer`: plays back a queue of listening outcomes
//! - `RecordingSynthesizer`: records spoken text, optionally slowly

use anyhow::{bail, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::channel::{
    InboundMessage, OutboundMessage, SessionIdentity, TimeSlot, Transport, TransportFrame,
    TransportLink,
};
use crate::speech::{SpeechRecognizer, SpeechSynthesizer, VoiceSettings};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

struct Peer {
    inbound: mpsc::UnboundedSender<TransportFrame>,
    outbound: mpsc::UnboundedReceiver<String>,
}

#[derive(Default)]
struct Wire {
    refuse: bool,
    opened: Vec<SessionIdentity>,
    peer: Option<Peer>,
    sent: Vec<String>,
}

impl Wire {
    fn drain_outbound(&mut self) {
        if let Some(peer) = self.peer.as_mut() {
            while let Ok(json) = peer.outbound.try_recv() {
                self.sent.push(json);
            }
        }
    }
}

/// In-memory transport; see `MockRemote` for the agent side
#[derive(Clone, Default)]
pub struct MockTransport {
    wire: Arc<Mutex<Wire>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agent side of every link this transport opens
    pub fn remote(&self) -> MockRemote {
        MockRemote {
            wire: Arc::clone(&self.wire),
        }
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn open(&self, identity: &SessionIdentity) -> Result<TransportLink> {
        let mut wire = lock(&self.wire);
        if wire.refuse {
            bail!("connection refused");
        }

        wire.drain_outbound();

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        wire.opened.push(identity.clone());
        wire.peer = Some(Peer {
            inbound: inbound_tx,
            outbound: outbound_rx,
        });

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Agent side of a `MockTransport`
#[derive(Clone)]
pub struct MockRemote {
    wire: Arc<Mutex<Wire>>,
}

impl MockRemote {
    /// Make subsequent connects fail
    pub fn refuse_connections(&self, refuse: bool) {
        lock(&self.wire).refuse = refuse;
    }

    /// Identities of every link opened so far
    pub fn opened(&self) -> Vec<SessionIdentity> {
        lock(&self.wire).opened.clone()
    }

    /// Whether the client side still holds the current link open
    pub fn is_open(&self) -> bool {
        lock(&self.wire)
            .peer
            .as_ref()
            .map(|peer| !peer.inbound.is_closed())
            .unwrap_or(false)
    }

    /// Deliver a raw text frame; false when no link is open
    pub fn push_text(&self, text: &str) -> bool {
        lock(&self.wire)
            .peer
            .as_ref()
            .map(|peer| peer.inbound.send(TransportFrame::Text(text.to_string())).is_ok())
            .unwrap_or(false)
    }

    /// Deliver a `response` frame
    pub fn reply(&self, content: &str, slots: &[TimeSlot]) -> bool {
        let message = InboundMessage::Response {
            content: content.to_string(),
            available_slots: Some(slots.to_vec()),
            conversation_state: None,
            timestamp: None,
        };

        match serde_json::to_string(&message) {
            Ok(json) => self.push_text(&json),
            Err(_) => false,
        }
    }

    /// Simulate the agent dropping the connection
    pub fn drop_connection(&self, reason: &str) {
        let mut wire = lock(&self.wire);
        wire.drain_outbound();
        if let Some(peer) = wire.peer.take() {
            let _ = peer.inbound.send(TransportFrame::Closed(reason.to_string()));
        }
    }

    /// Every raw frame the client has sent
    pub fn sent(&self) -> Vec<String> {
        let mut wire = lock(&self.wire);
        wire.drain_outbound();
        wire.sent.clone()
    }

    /// Every frame the client has sent, parsed
    pub fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent()
            .iter()
            .filter_map(|json| serde_json::from_str(json).ok())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Speech
// ---------------------------------------------------------------------------

/// One scripted listening outcome
#[derive(Debug, Clone)]
pub enum Heard {
    Transcript(String),
    Error(String),
    /// Never completes (until stopped or timed out)
    Silence,
}

/// Recognizer that replays scripted outcomes in order
///
/// Once the script runs out every episode is `Silence`.
pub struct ScriptedRecognizer {
    available: bool,
    script: Mutex<VecDeque<Heard>>,
}

impl ScriptedRecognizer {
    pub fn new(script: Vec<Heard>) -> Self {
        Self {
            available: true,
            script: Mutex::new(script.into()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            script: Mutex::new(VecDeque::new()),
        }
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn listen(&self) -> Result<String> {
        let next = lock(&self.script).pop_front();

        match next {
            Some(Heard::Transcript(text)) => Ok(text),
            Some(Heard::Error(code)) => bail!(code),
            Some(Heard::Silence) | None => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Synthesizer that records what it was asked to say
#[derive(Clone, Default)]
pub struct RecordingSynthesizer {
    spoken: Arc<Mutex<Vec<String>>>,
    delay: Duration,
    fail: bool,
}

impl RecordingSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each utterance takes `delay` to play
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Every utterance fails after being recorded
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn spoken(&self) -> Vec<String> {
        lock(&self.spoken).clone()
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for RecordingSynthesizer {
    async fn speak(&self, text: &str, _voice: &VoiceSettings) -> Result<()> {
        lock(&self.spoken).push(text.to_string());

        if self.fail {
            bail!("synthesis-failed");
        }

        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
