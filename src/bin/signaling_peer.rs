//! Demo signaling peer
//!
//! Connects to a signaling server, negotiates a session with whichever peer
//! is on the other side, and logs the exchange. No local media is attached;
//! the peer negotiates receive-only.

use camlink_signaling::{
    MediaEndpoint, NegotiationSession, SessionConfig, SessionRole, SignalingChannel,
    WebRtcEndpoint,
};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "signaling_peer", about = "Negotiate a WebRTC session over a signaling server")]
struct Args {
    /// Signaling server URL
    #[arg(long, env = "CAMLINK_SIGNALING_URL", default_value = "ws://localhost:8080/signal")]
    url: String,

    /// Answer a remote offer instead of initiating one
    #[arg(long)]
    callee: bool,

    /// STUN server URL
    #[arg(long, default_value = "stun:stun.l.google.com:19302")]
    stun: String,

    /// Fail the round if not negotiated within this many seconds (0 = wait forever)
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let role = if args.callee {
        SessionRole::Callee
    } else {
        SessionRole::Caller
    };

    let mut config = SessionConfig::default().with_role(role);
    config.signaling_url = args.url;
    config.stun_servers = vec![args.stun];
    if args.timeout_secs > 0 {
        config = config.with_negotiation_timeout(Duration::from_secs(args.timeout_secs));
    }
    config.validate()?;

    info!(
        "Starting {:?} peer against {}",
        config.role, config.signaling_url
    );

    let (event_tx, event_rx) = tokio::sync::mpsc::channel(64);
    let endpoint = Arc::new(WebRtcEndpoint::new(&config, Vec::new(), event_tx).await?);

    let channel = SignalingChannel::connect(&config.signaling_url).await?;
    let (sender, inbound) = channel.split();

    let mut session = NegotiationSession::new(
        &config,
        Arc::clone(&endpoint) as Arc<dyn MediaEndpoint>,
        event_rx,
        sender,
        inbound,
    );

    let result = session.run().await;
    endpoint.close();

    info!("Session ended in state {:?}", session.state());
    result?;
    Ok(())
}
