//! WebRTC session negotiation over WebSocket signaling
//!
//! This crate drives a single offer/answer round plus trickled ICE
//! candidates between two peers connected through a signaling server. It
//! owns the hard ordering rules of that exchange:
//!
//! - a local description is applied before its message is transmitted, and
//!   the applied and transmitted SDP are byte-identical;
//! - the remote offer is applied before an answer is produced;
//! - candidates may race the description exchange in either direction.
//!
//! Locally produced SDP is rewritten by [`sdp::strip_rtx`] to drop RTX
//! payload types before it is applied or sent.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  Signaling server (WebSocket)                        │
//! │  ↕ JSON frames: offer / answer / candidate           │
//! │  SignalingChannel ── SignalMessage codec             │
//! │        ↓ frames              ↑ frames                │
//! │  NegotiationSession (single-writer state machine)    │
//! │        ↓ dispatch            ↑ SessionEvent channel  │
//! │  MediaEndpoint seam → WebRtcEndpoint (webrtc-rs)     │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use camlink_signaling::{
//!     MediaEndpoint, NegotiationSession, SessionConfig, SignalingChannel, WebRtcEndpoint,
//! };
//!
//! # async fn example() -> camlink_signaling::Result<()> {
//! let config = SessionConfig::default();
//! config.validate()?;
//!
//! let (event_tx, event_rx) = tokio::sync::mpsc::channel(64);
//! let endpoint = Arc::new(WebRtcEndpoint::new(&config, Vec::new(), event_tx).await?);
//!
//! let channel = SignalingChannel::connect(&config.signaling_url).await?;
//! let (sender, inbound) = channel.split();
//!
//! let mut session = NegotiationSession::new(
//!     &config,
//!     endpoint as Arc<dyn MediaEndpoint>,
//!     event_rx,
//!     sender,
//!     inbound,
//! );
//! session.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod sdp;
pub mod signaling;

mod peer;
mod session;

pub use config::{SessionConfig, SessionRole, TurnServerConfig};
pub use error::{Error, Result};
pub use peer::{
    IceCandidate, MediaEndpoint, NegotiationOp, SdpKind, SessionDescription, SessionEvent,
    WebRtcEndpoint,
};
pub use session::{NegotiationSession, NegotiationState};
pub use signaling::{ChannelEvent, SignalMessage, SignalSender, SignalingChannel};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
