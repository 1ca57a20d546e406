use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::config::{SessionConfig, SpeakPolicy};
use super::handle::CoordinatorHandle;
use super::state::{ConversationSnapshot, ConversationState, Message, Phase};
use crate::channel::{
    ConnectionState, InboundMessage, OutboundMessage, SessionChannel, SessionIdentity, TimeSlot,
    Transport,
};
use crate::error::{Result, SchedulerError};
use crate::events::{
    CaptureEvent, ChannelEvent, CloseReason, Command, Intent, PlaybackEvent, SessionEvent,
};
use crate::speech::{SpeechCapture, SpeechPlayback, SpeechRecognizer, SpeechSynthesizer};

/// Utterance sent when the user picks a proposed slot
pub fn booking_utterance(slot: &TimeSlot) -> String {
    format!("I'd like to book the {} slot", slot.formatted_start)
}

/// Owner of one conversation
///
/// Consumes the single event queue fed by the session channel, speech capture,
/// speech playback and user commands, and is the only writer of the
/// conversation state. Every processed event publishes a fresh snapshot.
pub struct Coordinator {
    /// Stable for the coordinator's lifetime
    identity: SessionIdentity,

    config: SessionConfig,

    channel: SessionChannel,
    capture: SpeechCapture,
    playback: SpeechPlayback,

    conversation: ConversationState,

    /// Submits still waiting for a `response` frame
    outstanding_replies: usize,

    /// Utterance currently playing
    speaking: Option<u64>,

    last_error: Option<String>,

    /// Bumped by every reset
    resets: u64,

    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    snapshot_tx: watch::Sender<ConversationSnapshot>,
}

impl Coordinator {
    pub fn new(
        identity: SessionIdentity,
        config: SessionConfig,
        transport: Box<dyn Transport>,
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let channel = SessionChannel::new(transport, events_tx.clone());
        let capture = SpeechCapture::new(recognizer, config.capture_timeout, events_tx.clone());
        let playback = SpeechPlayback::new(synthesizer, config.voice, events_tx.clone());

        let initial = ConversationSnapshot {
            identity: identity.clone(),
            connection: ConnectionState::Disconnected,
            phase: Phase::NotConnected,
            messages: Vec::new(),
            proposed_slots: Vec::new(),
            listening: false,
            speaking: false,
            capture_available: capture.is_available(),
            last_error: None,
            resets: 0,
        };
        let (snapshot_tx, _) = watch::channel(initial);

        info!("Coordinator created for session {}", identity);

        Self {
            identity,
            config,
            channel,
            capture,
            playback,
            conversation: ConversationState::default(),
            outstanding_replies: 0,
            speaking: None,
            last_error: None,
            resets: 0,
            events_tx,
            events_rx,
            snapshot_tx,
        }
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Cloneable handle for presentation layers
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle::new(self.events_tx.clone(), self.snapshot_tx.subscribe())
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn phase(&self) -> Phase {
        if self.channel.state() != ConnectionState::Connected {
            Phase::NotConnected
        } else if self.outstanding_replies > 0 {
            Phase::AwaitingReply
        } else {
            Phase::Idle
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            identity: self.identity.clone(),
            connection: self.channel.state(),
            phase: self.phase(),
            messages: self.conversation.messages().to_vec(),
            proposed_slots: self.conversation.proposed_slots().to_vec(),
            listening: self.capture.is_listening(),
            speaking: self.speaking.is_some(),
            capture_available: self.capture.is_available(),
            last_error: self.last_error.clone(),
            resets: self.resets,
        }
    }

    // ------------------------------------------------------------------
    // User intents
    // ------------------------------------------------------------------

    /// Open the session channel with this coordinator's identity
    pub async fn connect(&mut self) -> Result<()> {
        if self.channel.state() == ConnectionState::Disconnected {
            // The previous link's close may still be queued; it is ignored once
            // the link is replaced, so finish its bookkeeping here
            self.on_disconnected();
        }

        let result = self.channel.connect(&self.identity).await;

        match &result {
            Ok(()) => {
                self.outstanding_replies = 0;
                self.last_error = None;
            }
            Err(e) => self.report(e),
        }

        self.publish();
        result
    }

    /// Close the channel; the conversation stays visible
    pub async fn disconnect(&mut self) {
        self.channel.disconnect().await;
        self.on_disconnected();
        self.publish();
    }

    /// Submit one utterance (typed, spoken, or a slot booking)
    ///
    /// Rejected without side effects when blank or when the channel is not
    /// connected. Otherwise the utterance is sent, appended to the log and,
    /// under the default speak policy, read back.
    pub fn submit(&mut self, text: &str) -> Result<()> {
        let content = text.trim();
        if content.is_empty() {
            debug!("Ignoring empty utterance");
            return Err(SchedulerError::EmptyUtterance);
        }

        let state = self.channel.state();
        if state != ConnectionState::Connected {
            warn!("Rejecting utterance: channel is {}", state);
            let err = SchedulerError::NotConnected;
            self.report(&err);
            self.publish();
            return Err(err);
        }

        if let Err(e) = self.channel.send(&OutboundMessage::utterance(content)) {
            self.report(&e);
            self.publish();
            return Err(e);
        }

        self.conversation.append(Message::user(content));
        self.outstanding_replies += 1;
        self.last_error = None;

        if self.config.speak_policy == SpeakPolicy::UserUtterance {
            self.playback.speak(content);
        }

        self.publish();
        Ok(())
    }

    /// Book the proposed slot at `index` by sending a booking utterance
    ///
    /// Proposed slots stay in place until the agent replaces them.
    pub fn select_slot(&mut self, index: usize) -> Result<()> {
        let utterance = match self.conversation.proposed_slots().get(index) {
            Some(slot) => booking_utterance(slot),
            None => {
                warn!("No proposed slot at index {}", index);
                return Err(SchedulerError::SlotNotFound(index));
            }
        };

        info!("Booking slot {}", index);
        self.submit(&utterance)
    }

    /// Start over: ask the agent to forget and clear everything locally
    ///
    /// The local clear happens even when the reset request cannot be sent.
    pub fn reset(&mut self) {
        if self.channel.state() == ConnectionState::Connected {
            if let Err(e) = self.channel.send(&OutboundMessage::ResetRequest) {
                warn!("Reset request not delivered: {}", e);
            }
        }

        self.conversation.reset();
        self.resets += 1;
        self.outstanding_replies = 0;
        self.last_error = None;

        info!("Conversation reset");
        self.publish();
    }

    /// Begin a voice input episode
    pub fn start_listening(&mut self) -> Result<()> {
        let state = self.channel.state();
        if state != ConnectionState::Connected {
            warn!("Voice input rejected: channel is {}", state);
            let err = SchedulerError::NotConnected;
            self.report(&err);
            self.publish();
            return Err(err);
        }

        let result = self.capture.start_listening().map(|_| ()).map_err(SchedulerError::from);
        if let Err(e) = &result {
            self.report(e);
        }

        self.publish();
        result
    }

    /// End the voice input episode without a transcript
    pub fn stop_listening(&mut self) {
        self.capture.stop_listening();
        self.publish();
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Process events until a shutdown command arrives
    pub async fn run(mut self) {
        info!("Coordinator running for session {}", self.identity);

        while self.step().await {}

        self.capture.stop_listening();
        self.playback.cancel();
        self.channel.disconnect().await;
        self.publish();

        info!("Coordinator stopped for session {}", self.identity);
    }

    /// Wait for the next queued event and process it
    ///
    /// Returns false once a shutdown command has been processed.
    pub async fn step(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => self.handle_event(event).await,
            None => false,
        }
    }

    /// Process one event; returns false for shutdown
    pub async fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Command(command) => return self.execute(command).await,
            SessionEvent::Channel { link, event } => self.on_channel_event(link, event),
            SessionEvent::Capture(event) => self.on_capture_event(event),
            SessionEvent::Playback(event) => self.on_playback_event(event),
        }

        self.publish();
        true
    }

    async fn execute(&mut self, command: Command) -> bool {
        let Command { intent, reply } = command;
        debug!("Command: {:?}", intent);

        let mut keep_running = true;
        let result = match intent {
            Intent::Connect => self.connect().await,
            Intent::Disconnect => {
                self.disconnect().await;
                Ok(())
            }
            Intent::Submit(text) => self.submit(&text),
            Intent::SelectSlot(index) => self.select_slot(index),
            Intent::Reset => {
                self.reset();
                Ok(())
            }
            Intent::StartListening => self.start_listening(),
            Intent::StopListening => {
                self.stop_listening();
                Ok(())
            }
            Intent::Shutdown => {
                keep_running = false;
                Ok(())
            }
        };

        if let Some(reply) = reply {
            let _ = reply.send(result);
        }

        keep_running
    }

    fn on_channel_event(&mut self, link: u64, event: ChannelEvent) {
        // Frames the old agent sent before going away still belong in the log,
        // but nothing else from a replaced link may touch the live session
        if link != self.channel.link() {
            match event {
                ChannelEvent::Inbound(message) => self.on_inbound(message, false),
                other => debug!("Ignoring {:?} from replaced link {}", other, link),
            }
            return;
        }

        match event {
            ChannelEvent::StateChanged(state) => debug!("Channel is {}", state),
            ChannelEvent::Inbound(message) => self.on_inbound(message, true),
            ChannelEvent::ProtocolError(detail) => {
                self.report(&SchedulerError::Protocol(detail));
            }
            ChannelEvent::Closed(CloseReason::Requested) => debug!("Channel closed on request"),
            ChannelEvent::Closed(CloseReason::Unexpected(reason)) => {
                let err = SchedulerError::Connection(format!("connection lost: {}", reason));
                error!("{}", err);
                self.last_error = Some(err.to_string());
                self.on_disconnected();
            }
        }
    }

    fn on_inbound(&mut self, message: InboundMessage, current_link: bool) {
        match message {
            InboundMessage::Response {
                content,
                available_slots,
                ..
            } => self.receive_reply(content, available_slots.unwrap_or_default(), current_link),
            InboundMessage::Connected { message, .. } => info!("Agent: {}", message),
            InboundMessage::Processing { .. } => debug!("Agent is processing"),
            InboundMessage::ResetComplete { .. } => info!("Agent conversation reset"),
            InboundMessage::Error { message, .. } if current_link => {
                warn!("Agent reported an error: {}", message);
                self.last_error = Some(message);
            }
            InboundMessage::Error { message, .. } => {
                debug!("Ignoring error from replaced link: {}", message);
            }
        }
    }

    /// Append the reply; a non-empty slot list replaces the proposed slots
    ///
    /// Replies from a replaced link do not count against the submits still
    /// waiting on the live one.
    fn receive_reply(&mut self, content: String, slots: Vec<TimeSlot>, current_link: bool) {
        if self.config.speak_policy == SpeakPolicy::AgentReply {
            self.playback.speak(content.clone());
        }

        self.conversation.append(Message::agent(content));

        if !slots.is_empty() {
            info!("Agent proposed {} slot(s)", slots.len());
            self.conversation.replace_slots(slots);
        }

        if current_link {
            self.outstanding_replies = self.outstanding_replies.saturating_sub(1);
        }
    }

    fn on_capture_event(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::Transcript { episode, text } => {
                info!("Heard utterance (episode {})", episode);
                if let Err(e) = self.submit(&text) {
                    warn!("Transcript not submitted: {}", e);
                }
            }
            CaptureEvent::Failed { error, .. } => {
                self.report(&SchedulerError::SpeechCapture(error));
            }
            CaptureEvent::Cancelled { episode } => debug!("Listening episode {} ended", episode),
        }
    }

    fn on_playback_event(&mut self, event: PlaybackEvent) {
        match event {
            // Tasks of interrupted utterances can report Started late
            PlaybackEvent::Started { utterance } if utterance < self.playback.latest() => {
                debug!("Utterance {} started after being replaced", utterance);
            }
            PlaybackEvent::Started { utterance } => self.speaking = Some(utterance),
            PlaybackEvent::Ended { utterance, interrupted } => {
                if interrupted {
                    debug!("Utterance {} interrupted", utterance);
                }
                if self.speaking == Some(utterance) {
                    self.speaking = None;
                }
            }
            PlaybackEvent::Failed { utterance, error } => {
                if self.speaking == Some(utterance) {
                    self.speaking = None;
                }
                self.report(&SchedulerError::SpeechPlayback(error));
            }
        }
    }

    /// Common bookkeeping after the channel goes down
    fn on_disconnected(&mut self) {
        self.outstanding_replies = 0;
        self.capture.stop_listening();

        if self.config.clear_slots_on_disconnect {
            self.conversation.clear_slots();
        }
    }

    fn report(&mut self, err: &SchedulerError) {
        warn!("{}", err);
        self.last_error = Some(err.to_string());
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}
