use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::events::{PlaybackEvent, SessionEvent};

/// Voice parameters passed to the engine (1.0 = engine default)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// Text-to-speech capability
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` to completion
    ///
    /// Dropping the returned future interrupts playback.
    async fn speak(&self, text: &str, voice: &VoiceSettings) -> Result<()>;

    /// Get engine name for logging
    fn name(&self) -> &str;
}

/// Replaceable, cancellable playback
///
/// A new `speak()` always interrupts the current utterance; nothing queues.
pub struct SpeechPlayback {
    engine: Arc<dyn SpeechSynthesizer>,
    voice: VoiceSettings,
    events: mpsc::UnboundedSender<SessionEvent>,
    last_utterance: u64,
    cancel: Option<oneshot::Sender<()>>,
}

impl SpeechPlayback {
    pub fn new(
        engine: Arc<dyn SpeechSynthesizer>,
        voice: VoiceSettings,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            engine,
            voice,
            events,
            last_utterance: 0,
            cancel: None,
        }
    }

    /// Interrupt any current playback and speak `text`
    ///
    /// Posts `Started` then exactly one of `Ended` or `Failed` for the
    /// returned utterance number.
    pub fn speak(&mut self, text: impl Into<String>) -> u64 {
        self.cancel();

        self.last_utterance += 1;
        let utterance = self.last_utterance;
        let text = text.into();

        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.cancel = Some(cancel_tx);

        let engine = Arc::clone(&self.engine);
        let voice = self.voice;
        let events = self.events.clone();

        debug!("Speaking utterance {} via {}", utterance, engine.name());

        tokio::spawn(async move {
            let _ = events.send(SessionEvent::Playback(PlaybackEvent::Started { utterance }));

            let event = tokio::select! {
                biased;

                _ = cancel_rx => PlaybackEvent::Ended { utterance, interrupted: true },

                result = engine.speak(&text, &voice) => match result {
                    Ok(()) => PlaybackEvent::Ended { utterance, interrupted: false },
                    Err(e) => {
                        warn!("Playback of utterance {} failed: {:#}", utterance, e);
                        PlaybackEvent::Failed { utterance, error: format!("{:#}", e) }
                    }
                },
            };

            let _ = events.send(SessionEvent::Playback(event));
        });

        utterance
    }

    /// Number of the most recent `speak()` call (0 before the first)
    pub fn latest(&self) -> u64 {
        self.last_utterance
    }

    /// Stop the current utterance; harmless when idle
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}
