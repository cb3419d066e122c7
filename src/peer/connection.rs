//! WebRTC-backed endpoint

use crate::config::SessionConfig;
use crate::peer::{
    IceCandidate, MediaEndpoint, NegotiationOp, SdpKind, SessionDescription, SessionEvent,
};
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::track::track_local::TrackLocal;

/// [`MediaEndpoint`] implementation over a webrtc-rs peer connection
///
/// All negotiation outcomes and peer callbacks are reported on the
/// [`SessionEvent`] channel supplied at construction; the dispatch methods
/// spawn and return immediately.
pub struct WebRtcEndpoint {
    peer_connection: Arc<RTCPeerConnection>,
    events: mpsc::Sender<SessionEvent>,
}

impl WebRtcEndpoint {
    /// Create the peer connection and install its callbacks
    ///
    /// `tracks` are pre-built local media tracks supplied by the caller's
    /// media source; the endpoint only attaches them, it never captures or
    /// encodes.
    pub async fn new(
        config: &SessionConfig,
        tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| Error::WebRtc(format!("Failed to register codecs: {}", e)))?;

        let interceptor_registry =
            register_default_interceptors(Default::default(), &mut media_engine)
                .map_err(|e| Error::WebRtc(format!("Failed to register interceptors: {}", e)))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptor_registry)
            .build();

        let ice_servers: Vec<RTCIceServer> = config
            .stun_servers
            .iter()
            .map(|url| RTCIceServer {
                urls: vec![url.clone()],
                ..Default::default()
            })
            .chain(config.turn_servers.iter().map(|turn| {
                #[allow(clippy::needless_update)]
                RTCIceServer {
                    urls: vec![turn.url.clone()],
                    username: turn.username.clone(),
                    credential: turn.credential.clone(),
                    ..Default::default()
                }
            }))
            .collect();

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(|e| Error::WebRtc(format!("Failed to create peer connection: {}", e)))?,
        );

        for track in tracks {
            peer_connection
                .add_track(track)
                .await
                .map_err(|e| Error::WebRtc(format!("Failed to add local track: {}", e)))?;
        }

        let endpoint = Self {
            peer_connection,
            events,
        };
        endpoint.install_callbacks();

        info!("Peer endpoint created");

        Ok(endpoint)
    }

    /// Wire peer-connection callbacks into the session event channel
    fn install_callbacks(&self) {
        let tx = self.events.clone();
        self.peer_connection
            .on_ice_candidate(Box::new(move |candidate| {
                let tx = tx.clone();
                Box::pin(async move {
                    let Some(candidate) = candidate else {
                        debug!("ICE candidate gathering finished");
                        return;
                    };

                    match candidate.to_json() {
                        Ok(json) => {
                            let gathered = IceCandidate {
                                candidate: json.candidate,
                                sdp_mid: json.sdp_mid.unwrap_or_default(),
                                sdp_mline_index: i32::from(json.sdp_mline_index.unwrap_or(0)),
                            };
                            let _ = tx.send(SessionEvent::CandidateGathered(gathered)).await;
                        }
                        Err(e) => warn!("Failed to serialize local ICE candidate: {}", e),
                    }
                })
            }));

        let tx = self.events.clone();
        self.peer_connection
            .on_signaling_state_change(Box::new(move |state| {
                let tx = tx.clone();
                Box::pin(async move {
                    let _ = tx
                        .send(SessionEvent::SignalingChanged(format!("{state:?}")))
                        .await;
                })
            }));

        let tx = self.events.clone();
        self.peer_connection
            .on_ice_connection_state_change(Box::new(move |state| {
                let tx = tx.clone();
                Box::pin(async move {
                    let _ = tx
                        .send(SessionEvent::IceConnectionChanged(format!("{state:?}")))
                        .await;
                })
            }));

        let tx = self.events.clone();
        self.peer_connection
            .on_ice_gathering_state_change(Box::new(move |state| {
                let tx = tx.clone();
                Box::pin(async move {
                    let _ = tx
                        .send(SessionEvent::IceGatheringChanged(format!("{state:?}")))
                        .await;
                })
            }));

        let tx = self.events.clone();
        self.peer_connection
            .on_track(Box::new(move |track, _receiver, _transceiver| {
                let tx = tx.clone();
                Box::pin(async move {
                    let _ = tx
                        .send(SessionEvent::RemoteStreamAdded(track.stream_id()))
                        .await;
                })
            }));
    }

    /// Convert to the webrtc-rs description type, which re-derives the
    /// parsed form from the (possibly rewritten) SDP text
    fn to_rtc_description(desc: SessionDescription) -> std::result::Result<RTCSessionDescription, webrtc::Error> {
        match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp),
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp),
        }
    }

    fn report_failure(tx: &mpsc::Sender<SessionEvent>, op: NegotiationOp, reason: String) {
        let tx = tx.clone();
        tokio::spawn(async move {
            let _ = tx
                .send(SessionEvent::NegotiationFailed { op, reason })
                .await;
        });
    }
}

impl MediaEndpoint for WebRtcEndpoint {
    fn create_offer(&self) {
        let pc = Arc::clone(&self.peer_connection);
        let tx = self.events.clone();
        tokio::spawn(async move {
            match pc.create_offer(None).await {
                Ok(offer) => {
                    debug!("Created SDP offer");
                    let _ = tx
                        .send(SessionEvent::OfferReady(SessionDescription::offer(
                            offer.sdp,
                        )))
                        .await;
                }
                Err(e) => {
                    let _ = tx
                        .send(SessionEvent::NegotiationFailed {
                            op: NegotiationOp::CreateOffer,
                            reason: e.to_string(),
                        })
                        .await;
                }
            }
        });
    }

    fn create_answer(&self) {
        let pc = Arc::clone(&self.peer_connection);
        let tx = self.events.clone();
        tokio::spawn(async move {
            match pc.create_answer(None).await {
                Ok(answer) => {
                    debug!("Created SDP answer");
                    let _ = tx
                        .send(SessionEvent::AnswerReady(SessionDescription::answer(
                            answer.sdp,
                        )))
                        .await;
                }
                Err(e) => {
                    let _ = tx
                        .send(SessionEvent::NegotiationFailed {
                            op: NegotiationOp::CreateAnswer,
                            reason: e.to_string(),
                        })
                        .await;
                }
            }
        });
    }

    fn set_local_description(&self, desc: SessionDescription) {
        let kind = desc.kind;
        let rtc_desc = match Self::to_rtc_description(desc) {
            Ok(d) => d,
            Err(e) => {
                Self::report_failure(
                    &self.events,
                    NegotiationOp::SetLocalDescription,
                    format!("Invalid local SDP: {}", e),
                );
                return;
            }
        };

        let pc = Arc::clone(&self.peer_connection);
        let tx = self.events.clone();
        tokio::spawn(async move {
            match pc.set_local_description(rtc_desc).await {
                Ok(()) => {
                    debug!("Local {:?} description applied", kind);
                    let _ = tx.send(SessionEvent::LocalDescApplied(kind)).await;
                }
                Err(e) => {
                    let _ = tx
                        .send(SessionEvent::NegotiationFailed {
                            op: NegotiationOp::SetLocalDescription,
                            reason: e.to_string(),
                        })
                        .await;
                }
            }
        });
    }

    fn set_remote_description(&self, desc: SessionDescription) {
        let kind = desc.kind;
        let rtc_desc = match Self::to_rtc_description(desc) {
            Ok(d) => d,
            Err(e) => {
                Self::report_failure(
                    &self.events,
                    NegotiationOp::SetRemoteDescription,
                    format!("Invalid remote SDP: {}", e),
                );
                return;
            }
        };

        let pc = Arc::clone(&self.peer_connection);
        let tx = self.events.clone();
        tokio::spawn(async move {
            match pc.set_remote_description(rtc_desc).await {
                Ok(()) => {
                    debug!("Remote {:?} description applied", kind);
                    let _ = tx.send(SessionEvent::RemoteDescApplied(kind)).await;
                }
                Err(e) => {
                    let _ = tx
                        .send(SessionEvent::NegotiationFailed {
                            op: NegotiationOp::SetRemoteDescription,
                            reason: e.to_string(),
                        })
                        .await;
                }
            }
        });
    }

    fn add_remote_candidate(&self, candidate: IceCandidate) {
        // The wire index is i32; webrtc-rs wants u16. Out-of-range indices
        // are clamped to keep a malformed frame from poisoning the round.
        let sdp_mline_index = match u16::try_from(candidate.sdp_mline_index) {
            Ok(idx) => idx,
            Err(_) => {
                warn!(
                    "Clamping out-of-range sdpMLineIndex {} to 0",
                    candidate.sdp_mline_index
                );
                0
            }
        };

        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: Some(candidate.sdp_mid),
            sdp_mline_index: Some(sdp_mline_index),
            username_fragment: None,
        };

        let pc = Arc::clone(&self.peer_connection);
        tokio::spawn(async move {
            if let Err(e) = pc.add_ice_candidate(init).await {
                warn!("Failed to add remote ICE candidate: {}", e);
            }
        });
    }

    fn close(&self) {
        let pc = Arc::clone(&self.peer_connection);
        tokio::spawn(async move {
            if let Err(e) = pc.close().await {
                warn!("Failed to close peer connection: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_endpoint_creation() {
        let config = SessionConfig::default();
        let (tx, _rx) = mpsc::channel(16);

        let endpoint = WebRtcEndpoint::new(&config, Vec::new(), tx).await.unwrap();
        endpoint.close();
    }

    #[tokio::test]
    async fn test_create_offer_emits_offer_ready() {
        let config = SessionConfig::default();
        let (tx, mut rx) = mpsc::channel(16);

        let endpoint = WebRtcEndpoint::new(&config, Vec::new(), tx).await.unwrap();
        endpoint.create_offer();

        loop {
            match rx.recv().await.expect("event channel closed") {
                SessionEvent::OfferReady(desc) => {
                    assert_eq!(desc.kind, SdpKind::Offer);
                    assert!(!desc.sdp.is_empty());
                    break;
                }
                SessionEvent::NegotiationFailed { op, reason } => {
                    panic!("offer failed: {} {}", op, reason)
                }
                _ => {} // observability events may interleave
            }
        }
    }

    #[tokio::test]
    async fn test_invalid_local_sdp_reports_failure() {
        let config = SessionConfig::default();
        let (tx, mut rx) = mpsc::channel(16);

        let endpoint = WebRtcEndpoint::new(&config, Vec::new(), tx).await.unwrap();
        endpoint.set_local_description(SessionDescription::offer("not sdp"));

        loop {
            match rx.recv().await.expect("event channel closed") {
                SessionEvent::NegotiationFailed { op, .. } => {
                    assert_eq!(op, NegotiationOp::SetLocalDescription);
                    break;
                }
                _ => {}
            }
        }
    }
}
