// WebSocket transport to the scheduling agent
//
// One socket per session identity at `{base}/ws/{identity}`. A pump task owns
// the socket: it forwards text frames inbound and queued JSON outbound, and
// reports the first close or error as a `TransportFrame::Closed`.

use anyhow::{anyhow, bail, Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info};
use url::Url;

use super::identity::SessionIdentity;
use super::transport::{Transport, TransportFrame, TransportLink};

pub struct WebSocketTransport {
    base_url: Url,
}

impl WebSocketTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).context("Invalid agent WebSocket URL")?;
        if !matches!(base_url.scheme(), "ws" | "wss") {
            bail!("Agent URL must use ws:// or wss://, got {}", base_url);
        }

        Ok(Self { base_url })
    }

    /// Channel address for a session identity
    pub fn endpoint(&self, identity: &SessionIdentity) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Agent URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .push("ws")
            .push(identity.as_str());
        Ok(url)
    }
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, identity: &SessionIdentity) -> Result<TransportLink> {
        let url = self.endpoint(identity)?;
        info!("Connecting to agent at {}", url);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .context("Failed to open agent WebSocket")?;

        info!("Agent WebSocket open");

        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = read.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            if inbound_tx.send(TransportFrame::Text(text)).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame
                                .map(|f| format!("closed by agent ({}): {}", u16::from(f.code), f.reason))
                                .unwrap_or_else(|| "closed by agent".to_string());
                            let _ = inbound_tx.send(TransportFrame::Closed(reason));
                            break;
                        }
                        Some(Ok(_)) => {} // Binary, ping/pong
                        Some(Err(e)) => {
                            let _ = inbound_tx.send(TransportFrame::Closed(format!("read error: {}", e)));
                            break;
                        }
                        None => {
                            let _ = inbound_tx.send(TransportFrame::Closed("stream ended".to_string()));
                            break;
                        }
                    },
                    outbound = outbound_rx.recv() => match outbound {
                        Some(json) => {
                            if let Err(e) = write.send(Message::Text(json)).await {
                                let _ = inbound_tx.send(TransportFrame::Closed(format!("send error: {}", e)));
                                break;
                            }
                        }
                        None => {
                            // Local side hung up
                            if let Err(e) = write.send(Message::Close(None)).await {
                                debug!("Close frame not delivered: {}", e);
                            }
                            break;
                        }
                    },
                }
            }

            debug!("Agent WebSocket pump stopped");
        });

        Ok(TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }

    fn name(&self) -> &str {
        "websocket"
    }
}
