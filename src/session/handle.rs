use tokio::sync::{mpsc, oneshot, watch};

use super::state::ConversationSnapshot;
use crate::error::{Result, SchedulerError};
use crate::events::{Command, Intent, SessionEvent};

/// Cloneable front door to a running coordinator
///
/// Each call posts a command on the coordinator queue and waits for its
/// outcome, so intents are processed in the same order as channel and
/// speech events.
#[derive(Clone)]
pub struct CoordinatorHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
    snapshots: watch::Receiver<ConversationSnapshot>,
}

impl CoordinatorHandle {
    pub(crate) fn new(
        events: mpsc::UnboundedSender<SessionEvent>,
        snapshots: watch::Receiver<ConversationSnapshot>,
    ) -> Self {
        Self { events, snapshots }
    }

    pub async fn connect(&self) -> Result<()> {
        self.request(Intent::Connect).await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.request(Intent::Disconnect).await
    }

    pub async fn submit(&self, text: impl Into<String>) -> Result<()> {
        self.request(Intent::Submit(text.into())).await
    }

    pub async fn select_slot(&self, index: usize) -> Result<()> {
        self.request(Intent::SelectSlot(index)).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.request(Intent::Reset).await
    }

    pub async fn start_listening(&self) -> Result<()> {
        self.request(Intent::StartListening).await
    }

    pub async fn stop_listening(&self) -> Result<()> {
        self.request(Intent::StopListening).await
    }

    /// Stop the coordinator loop (closes the channel)
    pub async fn shutdown(&self) -> Result<()> {
        self.request(Intent::Shutdown).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Watch for state changes
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.snapshots.clone()
    }

    async fn request(&self, intent: Intent) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.events
            .send(SessionEvent::Command(Command {
                intent,
                reply: Some(reply_tx),
            }))
            .map_err(|_| SchedulerError::Stopped)?;

        reply_rx.await.map_err(|_| SchedulerError::Stopped)?
    }
}
