// WebSocket bridge to the companion browser page.
//
// The page reports its Picture-in-Picture capabilities in a HELLO message and
// carries out window and video requests on our behalf. One page is served at
// a time; losing the connection resets capabilities to none.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::present::PresentError;
use crate::protocol::{Capabilities, ClientMessage, ServerMessage};

/// Events published by the bridge to every subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// A page completed the WebSocket handshake.
    Connected { addr: String },
    /// The current page went away.
    Disconnected,
    /// A parsed message from the page.
    Message(ClientMessage),
}

/// Server half: owned by the accept loop.
pub struct BridgeServer {
    outbound: mpsc::Receiver<ServerMessage>,
    events: broadcast::Sender<BridgeEvent>,
    /// `None` while no page is connected.
    page: watch::Sender<Option<Capabilities>>,
}

/// Client half: cloned into the orchestrator and renderers.
#[derive(Clone)]
pub struct BridgeHandle {
    outbound: mpsc::Sender<ServerMessage>,
    events: broadcast::Sender<BridgeEvent>,
    page: watch::Receiver<Option<Capabilities>>,
}

/// Create a connected server/handle pair. `capacity` bounds both the
/// outbound queue and the event broadcast buffer.
pub fn channel(capacity: usize) -> (BridgeServer, BridgeHandle) {
    let (out_tx, out_rx) = mpsc::channel(capacity);
    let (events, _) = broadcast::channel(capacity);
    let (page_tx, page_rx) = watch::channel(None);
    (
        BridgeServer {
            outbound: out_rx,
            events: events.clone(),
            page: page_tx,
        },
        BridgeHandle {
            outbound: out_tx,
            events,
            page: page_rx,
        },
    )
}

impl BridgeHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.page.borrow().is_some()
    }

    /// Capabilities of the connected page; none when disconnected.
    pub fn capabilities(&self) -> Capabilities {
        self.page.borrow().unwrap_or_default()
    }

    /// Queue `msg` for the connected page.
    pub async fn send(&self, msg: ServerMessage) -> Result<(), PresentError> {
        if !self.is_connected() {
            return Err(PresentError::BridgeUnavailable);
        }
        self.outbound
            .send(msg)
            .await
            .map_err(|_| PresentError::BridgeUnavailable)
    }
}

impl BridgeServer {
    fn mark_connected(&self, addr: &str) {
        self.page.send_replace(Some(Capabilities::none()));
        let _ = self.events.send(BridgeEvent::Connected {
            addr: addr.to_string(),
        });
    }

    fn mark_disconnected(&self) {
        self.page.send_replace(None);
        let _ = self.events.send(BridgeEvent::Disconnected);
    }

    /// Parse one text frame from the page and publish it.
    fn handle_text(&self, text: &str, addr: &str) {
        let msg = match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Ignoring malformed message from {addr}: {e}");
                return;
            }
        };

        match &msg {
            ClientMessage::Hello { payload } => {
                let caps = payload.capabilities();
                info!(
                    "Page at {addr} says hello ({}): document PiP={}, video PiP={}",
                    payload.user_agent, caps.document_pip, caps.video_pip
                );
                self.page.send_replace(Some(caps));
            }
            ClientMessage::Heartbeat => {}
            other => debug!("Page message from {addr}: {other:?}"),
        }

        let _ = self.events.send(BridgeEvent::Message(msg));
    }
}

/// Accept pages on `listener` forever, one connection at a time.
///
/// Messages queued while no page is connected are dropped. Returns when
/// every `BridgeHandle` has been dropped.
pub async fn run(listener: TcpListener, mut server: BridgeServer) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    info!("Companion bridge listening on {local_addr}");

    loop {
        let (stream, addr) = tokio::select! {
            accepted = listener.accept() => accepted?,
            queued = server.outbound.recv() => match queued {
                Some(msg) => {
                    debug!("No page connected, dropping {msg:?}");
                    continue;
                }
                None => break,
            },
        };
        let addr = addr.to_string();
        info!("Accepted TCP connection from {addr}");

        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!("WebSocket handshake failed for {addr}: {e}");
                continue;
            }
        };

        if !serve_connection(ws_stream, &mut server, &addr).await {
            break;
        }
    }

    info!("Companion bridge shut down");
    Ok(())
}

/// Serve one page until it disconnects. Returns `false` once every handle
/// is gone and the bridge should stop.
///
/// Generic over the stream so tests can drive it over an in-memory pipe.
pub async fn serve_connection<S>(
    ws: WebSocketStream<S>,
    server: &mut BridgeServer,
    addr: &str,
) -> bool
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    server.mark_connected(addr);
    let (mut write, mut read) = ws.split();

    let keep_running = loop {
        tokio::select! {
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => server.handle_text(text.as_str(), addr),
                Some(Ok(Message::Close(_))) => {
                    info!("Page {addr} sent close frame");
                    break true;
                }
                Some(Err(e)) => {
                    warn!("WebSocket error from {addr}: {e}");
                    break true;
                }
                None => break true,
                // Binary, Ping, Pong and raw frames carry nothing for us.
                Some(Ok(_)) => {}
            },
            queued = server.outbound.recv() => match queued {
                Some(msg) => {
                    let json = match serde_json::to_string(&msg) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("Failed to encode {msg:?}: {e}");
                            continue;
                        }
                    };
                    if let Err(e) = write.send(Message::Text(json.into())).await {
                        warn!("Failed to send to {addr}: {e}");
                        break true;
                    }
                }
                None => {
                    let _ = write.close().await;
                    break false;
                }
            },
        }
    };

    server.mark_disconnected();
    info!("Page {addr} disconnected");
    keep_running
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// Stand-in for the companion page that talks to a `BridgeServer` directly,
/// without a socket.
#[cfg(test)]
pub(crate) struct FakePage {
    server: BridgeServer,
}

#[cfg(test)]
impl FakePage {
    /// A bridge with a page already connected when `caps` is `Some`.
    pub(crate) fn new(caps: Option<Capabilities>) -> (FakePage, BridgeHandle) {
        let (server, handle) = channel(64);
        if let Some(caps) = caps {
            server.page.send_replace(Some(caps));
        }
        (FakePage { server }, handle)
    }

    /// Next message the core sent to the page.
    pub(crate) async fn next_sent(&mut self) -> ServerMessage {
        self.server
            .outbound
            .recv()
            .await
            .expect("bridge handle dropped")
    }

    pub(crate) fn try_next_sent(&mut self) -> Option<ServerMessage> {
        self.server.outbound.try_recv().ok()
    }

    /// Drain everything sent so far.
    pub(crate) fn sent(&mut self) -> Vec<ServerMessage> {
        std::iter::from_fn(|| self.try_next_sent()).collect()
    }

    pub(crate) fn reply(&self, msg: ClientMessage) {
        let _ = self.server.events.send(BridgeEvent::Message(msg));
    }

    pub(crate) fn disconnect(&self) {
        self.server.mark_disconnected();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
