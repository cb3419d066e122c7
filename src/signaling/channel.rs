//! WebSocket signaling transport adapter
//!
//! Wraps one duplex WebSocket connection: outbound text frames go through a
//! queue drained by a sender task, inbound frames are forwarded to a single
//! consumer as [`ChannelEvent`]s by a receiver task that re-arms immediately
//! after each delivered frame. There is no auto-reconnect; when the stream
//! ends the caller decides whether to connect again.

use crate::{Error, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Capacity of the inbound frame queue
const INBOUND_QUEUE_DEPTH: usize = 64;

/// An event delivered on the inbound half of the channel
///
/// The stream of events ends (the receiver yields `None`) when the
/// connection closes; a transport failure is reported as
/// [`ChannelEvent::Error`] first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// One inbound signaling frame
    Frame(String),

    /// The connection failed; no more frames will follow
    Error(String),
}

/// Cloneable handle for sending signaling frames
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<String>,
}

impl SignalSender {
    /// Wrap a raw outbound frame queue
    ///
    /// Used by tests and by callers bringing their own transport; normal use
    /// goes through [`SignalingChannel::connect`].
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Queue a text frame for transmission
    ///
    /// Fails once the connection (or the queue's consumer) is gone.
    pub fn send(&self, text: String) -> Result<()> {
        self.tx
            .send(text)
            .map_err(|_| Error::Transport("signaling connection closed".to_string()))
    }
}

/// A connected signaling channel
pub struct SignalingChannel {
    sender: SignalSender,
    inbound: mpsc::Receiver<ChannelEvent>,
}

impl SignalingChannel {
    /// Connect to the signaling server
    ///
    /// Establishes the WebSocket connection and spawns the sender and
    /// receiver tasks.
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to signaling server: {}", url);

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::Transport(format!("Failed to connect to {}: {}", url, e)))?;

        info!("Connected to signaling server");

        let (write, read) = ws_stream.split();

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);

        tokio::spawn(Self::sender_task(write, out_rx));
        tokio::spawn(Self::receiver_task(read, in_tx));

        Ok(Self {
            sender: SignalSender::new(out_tx),
            inbound: in_rx,
        })
    }

    /// Split into the send handle and the inbound event stream
    pub fn split(self) -> (SignalSender, mpsc::Receiver<ChannelEvent>) {
        (self.sender, self.inbound)
    }

    /// Sender task: drains queued frames into the WebSocket sink
    async fn sender_task(
        mut write: futures::stream::SplitSink<WsStream, Message>,
        mut rx: mpsc::UnboundedReceiver<String>,
    ) {
        while let Some(text) = rx.recv().await {
            if let Err(e) = write.send(Message::Text(text)).await {
                error!("Failed to send signaling frame: {}", e);
                break;
            }
        }

        debug!("Signaling sender task terminated");
    }

    /// Receiver task: forwards inbound frames until close or error
    async fn receiver_task(
        mut read: futures::stream::SplitStream<WsStream>,
        tx: mpsc::Sender<ChannelEvent>,
    ) {
        while let Some(next) = read.next().await {
            match next {
                Ok(Message::Text(text)) => {
                    if tx.send(ChannelEvent::Frame(text)).await.is_err() {
                        debug!("Inbound consumer dropped, stopping receiver");
                        break;
                    }
                }
                Ok(Message::Binary(data)) => match String::from_utf8(data) {
                    Ok(text) => {
                        if tx.send(ChannelEvent::Frame(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => warn!("Dropping non-UTF-8 binary signaling frame"),
                },
                Ok(Message::Close(_)) => {
                    info!("Signaling connection closed by remote");
                    break;
                }
                Ok(_) => {
                    // ping/pong, handled by tungstenite
                }
                Err(e) => {
                    error!("Signaling receive error: {}", e);
                    let _ = tx.send(ChannelEvent::Error(e.to_string())).await;
                    break;
                }
            }
        }

        debug!("Signaling receiver task terminated");
    }
}
