use anyhow::Result;
use tokio::sync::mpsc;

use super::identity::SessionIdentity;

/// Frame delivered by a transport to the session channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFrame {
    /// A text frame from the agent
    Text(String),
    /// The remote side went away (reason for logging)
    Closed(String),
}

/// An open duplex link
///
/// Dropping `outbound` asks the transport to close the connection.
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<TransportFrame>,
}

/// Duplex transport to the agent
///
/// Implementations:
/// - WebSocket: `ws://host/ws/{identity}` (production)
/// - Mock: in-memory link for tests (see `crate::testing`)
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Open a link addressed by the session identity
    async fn open(&self, identity: &SessionIdentity) -> Result<TransportLink>;

    /// Get transport name for logging
    fn name(&self) -> &str;
}
