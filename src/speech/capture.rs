use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::events::{CaptureEvent, SessionEvent};

/// Speech-to-text capability
#[async_trait::async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Whether an engine exists at all on this platform
    fn is_available(&self) -> bool;

    /// Listen for one complete utterance and return its transcript
    ///
    /// Dropping the returned future stops the engine and discards any
    /// partial transcript.
    async fn listen(&self) -> Result<String>;

    /// Get engine name for logging
    fn name(&self) -> &str;
}

/// Idle → Listening → (Transcript | Failed | Cancelled) → Idle
pub struct SpeechCapture {
    engine: Arc<dyn SpeechRecognizer>,
    events: mpsc::UnboundedSender<SessionEvent>,

    /// Listening episodes older than this end as `Cancelled`
    timeout: Option<Duration>,

    /// Episode currently listening (0 = idle), shared with the episode task
    listening: Arc<AtomicU64>,

    last_episode: u64,
    cancel: Option<oneshot::Sender<()>>,
}

enum Outcome {
    Heard(String),
    Failed(CaptureError),
    Cancelled,
}

impl SpeechCapture {
    pub fn new(
        engine: Arc<dyn SpeechRecognizer>,
        timeout: Option<Duration>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            engine,
            events,
            timeout,
            listening: Arc::new(AtomicU64::new(0)),
            last_episode: 0,
            cancel: None,
        }
    }

    /// Checked before offering voice input
    pub fn is_available(&self) -> bool {
        self.engine.is_available()
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst) != 0
    }

    /// Begin a listening episode and return its number
    ///
    /// Exactly one `CaptureEvent` is posted for the episode.
    pub fn start_listening(&mut self) -> std::result::Result<u64, CaptureError> {
        if !self.engine.is_available() {
            warn!("Speech capture unavailable ({})", self.engine.name());
            return Err(CaptureError::Unavailable);
        }

        if self.is_listening() {
            warn!("Start listening ignored: already listening");
            return Err(CaptureError::AlreadyListening);
        }

        self.last_episode += 1;
        let episode = self.last_episode;
        self.listening.store(episode, Ordering::SeqCst);

        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.cancel = Some(cancel_tx);

        let engine = Arc::clone(&self.engine);
        let listening = Arc::clone(&self.listening);
        let events = self.events.clone();
        let timeout = self.timeout;

        info!("Listening (episode {}, engine {})", episode, engine.name());

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;

                // Fires on stop_listening() or when the adapter is dropped
                _ = cancel_rx => Outcome::Cancelled,

                _ = expire(timeout) => {
                    warn!("Listening episode {} timed out", episode);
                    Outcome::Cancelled
                }

                result = engine.listen() => match result {
                    Ok(text) if text.trim().is_empty() => {
                        Outcome::Failed(CaptureError::Engine("no-speech".to_string()))
                    }
                    Ok(text) => Outcome::Heard(text),
                    Err(e) => Outcome::Failed(CaptureError::Engine(format!("{:#}", e))),
                },
            };

            // Leave Listening only if a newer episode has not taken over
            let _ = listening.compare_exchange(episode, 0, Ordering::SeqCst, Ordering::SeqCst);

            let event = match outcome {
                Outcome::Heard(text) => CaptureEvent::Transcript { episode, text },
                Outcome::Failed(error) => {
                    warn!("Listening episode {} failed: {}", episode, error);
                    CaptureEvent::Failed { episode, error }
                }
                Outcome::Cancelled => {
                    debug!("Listening episode {} cancelled", episode);
                    CaptureEvent::Cancelled { episode }
                }
            };

            let _ = events.send(SessionEvent::Capture(event));
        });

        Ok(episode)
    }

    /// Return to Idle, discarding any partial transcript
    ///
    /// Returns false when nothing was listening.
    pub fn stop_listening(&mut self) -> bool {
        let episode = self.listening.swap(0, Ordering::SeqCst);

        match self.cancel.take() {
            Some(cancel) if episode != 0 => {
                let _ = cancel.send(());
                info!("Stopped listening (episode {})", episode);
                true
            }
            _ => {
                debug!("Stop listening ignored: not listening");
                false
            }
        }
    }
}

async fn expire(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}
