//! Signaling wire protocol and transport
//!
//! The wire format is a flat JSON object with a `type` discriminator,
//! carried as text frames over a WebSocket to the signaling server.

mod channel;
mod message;

pub use channel::{ChannelEvent, SignalSender, SignalingChannel};
pub use message::SignalMessage;
