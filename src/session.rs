//! Negotiation state machine
//!
//! One [`NegotiationSession`] owns the endpoint seam and the signaling
//! channel halves and is the only writer of negotiation state: every
//! endpoint completion, gathered candidate and inbound frame funnels into
//! the same loop. Ordering invariants enforced here:
//!
//! - a local description is rewritten by [`strip_rtx`] before it is applied,
//!   and the transmitted SDP is the exact bytes that were applied;
//! - the offer/answer message is sent only after the endpoint confirms the
//!   local description was applied;
//! - `create_answer` is dispatched only after the remote offer was applied.

use crate::config::{SessionConfig, SessionRole};
use crate::peer::{
    IceCandidate, MediaEndpoint, NegotiationOp, SdpKind, SessionDescription, SessionEvent,
};
use crate::sdp::strip_rtx;
use crate::signaling::{ChannelEvent, SignalMessage, SignalSender};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Where a negotiation round currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationState {
    /// Nothing in flight
    Idle,
    /// Local offer requested from the endpoint
    OfferCreated,
    /// Local offer applied locally, transmission pending
    OfferSent,
    /// Offer transmitted, waiting for the remote answer
    AwaitingAnswer,
    /// Remote offer being applied
    RemoteOfferReceived,
    /// Local answer requested / being applied
    AnswerCreated,
    /// Both descriptions applied; candidates may still trickle
    Negotiated,
    /// The round was aborted; restarting is the caller's decision
    Failed(String),
    /// The signaling channel ended
    Closed,
}

/// Drives one offer/answer round plus trickled candidates
///
/// Construct with the split halves of a [`SignalingChannel`]
/// (or any pair of queues in tests), then call [`run`](Self::run).
///
/// [`SignalingChannel`]: crate::signaling::SignalingChannel
pub struct NegotiationSession {
    session_id: String,
    role: SessionRole,
    negotiation_timeout: Option<Duration>,
    state: NegotiationState,
    endpoint: Arc<dyn MediaEndpoint>,
    events: mpsc::Receiver<SessionEvent>,
    sender: SignalSender,
    inbound: mpsc::Receiver<ChannelEvent>,
    /// Local description held between `set_local_description` dispatch and
    /// transmission; discarded on failure
    pending_local: Option<SessionDescription>,
}

impl NegotiationSession {
    /// Create a session over an endpoint and a connected signaling channel
    pub fn new(
        config: &SessionConfig,
        endpoint: Arc<dyn MediaEndpoint>,
        events: mpsc::Receiver<SessionEvent>,
        sender: SignalSender,
        inbound: mpsc::Receiver<ChannelEvent>,
    ) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            role: config.role,
            negotiation_timeout: config.negotiation_timeout,
            state: NegotiationState::Idle,
            endpoint,
            events,
            sender,
            inbound,
            pending_local: None,
        }
    }

    /// Current negotiation state
    pub fn state(&self) -> &NegotiationState {
        &self.state
    }

    /// Session identifier used in logs
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Run the session until the channel closes or the round fails
    ///
    /// A [`SessionRole::Caller`] starts offering as soon as the loop is
    /// entered; a [`SessionRole::Callee`] waits for a remote offer. Returns `Ok`
    /// once the signaling channel ends (state [`NegotiationState::Closed`]);
    /// any transport or negotiation failure is returned after recording
    /// [`NegotiationState::Failed`].
    pub async fn run(&mut self) -> Result<()> {
        if self.role == SessionRole::Caller {
            self.start_offer();
        }

        let deadline = self.negotiation_timeout.map(|t| Instant::now() + t);

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event)?,
                    None => {
                        // Endpoint dropped its event channel; nothing more
                        // can complete.
                        warn!(session_id = %self.session_id, "Endpoint event channel closed");
                        self.pending_local = None;
                        self.state = NegotiationState::Closed;
                        return Ok(());
                    }
                },
                frame = self.inbound.recv() => match frame {
                    Some(ChannelEvent::Frame(text)) => self.handle_frame(&text)?,
                    Some(ChannelEvent::Error(reason)) => {
                        self.pending_local = None;
                        self.state = NegotiationState::Failed(reason.clone());
                        return Err(Error::Transport(reason));
                    }
                    None => {
                        info!(session_id = %self.session_id, "Signaling channel closed");
                        self.pending_local = None;
                        self.state = NegotiationState::Closed;
                        return Ok(());
                    }
                },
                _ = Self::round_deadline(deadline),
                    if deadline.is_some() && !matches!(self.state, NegotiationState::Negotiated) =>
                {
                    let reason = "negotiation deadline elapsed".to_string();
                    self.pending_local = None;
                    self.state = NegotiationState::Failed(reason.clone());
                    return Err(Error::Timeout(reason));
                }
            }
        }
    }

    async fn round_deadline(deadline: Option<Instant>) {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }

    /// Begin a round by asking the endpoint for an offer
    ///
    /// Only meaningful from [`NegotiationState::Idle`]; anywhere else the
    /// request is logged and dropped (one round in flight at a time).
    pub fn start_offer(&mut self) {
        if self.state != NegotiationState::Idle {
            warn!(
                session_id = %self.session_id,
                state = ?self.state,
                "Ignoring start_offer outside Idle"
            );
            return;
        }

        self.endpoint.create_offer();
        self.set_state(NegotiationState::OfferCreated);
    }

    /// Apply one endpoint event to the state machine
    pub fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::OfferReady(desc) => self.on_local_description_ready(desc),
            SessionEvent::AnswerReady(desc) => self.on_local_description_ready(desc),
            SessionEvent::LocalDescApplied(kind) => self.on_local_description_applied(kind),
            SessionEvent::RemoteDescApplied(kind) => self.on_remote_description_applied(kind),
            SessionEvent::CandidateGathered(candidate) => self.send_candidate(candidate),
            SessionEvent::SignalingChanged(state) => {
                debug!(session_id = %self.session_id, "Signaling state: {}", state);
                Ok(())
            }
            SessionEvent::IceConnectionChanged(state) => {
                info!(session_id = %self.session_id, "ICE connection state: {}", state);
                Ok(())
            }
            SessionEvent::IceGatheringChanged(state) => {
                debug!(session_id = %self.session_id, "ICE gathering state: {}", state);
                Ok(())
            }
            SessionEvent::RemoteStreamAdded(stream_id) => {
                info!(session_id = %self.session_id, "Remote stream added: {}", stream_id);
                Ok(())
            }
            SessionEvent::RemoteStreamRemoved(stream_id) => {
                info!(session_id = %self.session_id, "Remote stream removed: {}", stream_id);
                Ok(())
            }
            SessionEvent::NegotiationFailed { op, reason } => Err(self.fail(op, reason)),
        }
    }

    /// Apply one inbound signaling frame to the state machine
    pub fn handle_frame(&mut self, text: &str) -> Result<()> {
        match SignalMessage::from_json_lossy(text) {
            SignalMessage::Offer { sdp } => self.on_remote_offer(sdp),
            SignalMessage::Answer { sdp } => self.on_remote_answer(sdp),
            SignalMessage::Candidate {
                candidate,
                sdp_mid,
                sdp_mline_index,
            } => {
                // Forwarded in any state, even before a remote description
                // exists; the endpoint decides what it can do with it.
                debug!(session_id = %self.session_id, "Applying remote ICE candidate");
                self.endpoint.add_remote_candidate(IceCandidate {
                    candidate,
                    sdp_mid,
                    sdp_mline_index,
                });
                Ok(())
            }
            SignalMessage::Unknown { raw } => {
                debug!(
                    session_id = %self.session_id,
                    frame = %raw,
                    "Ignoring unrecognized signaling message"
                );
                Ok(())
            }
        }
    }

    /// A locally created offer/answer is ready: rewrite it, hold it, and ask
    /// the endpoint to apply it. The same bytes go on the wire later.
    fn on_local_description_ready(&mut self, desc: SessionDescription) -> Result<()> {
        let expected = match desc.kind {
            SdpKind::Offer => NegotiationState::OfferCreated,
            SdpKind::Answer => NegotiationState::AnswerCreated,
        };
        if self.state != expected {
            debug!(
                session_id = %self.session_id,
                state = ?self.state,
                "Ignoring stale {:?} description",
                desc.kind
            );
            return Ok(());
        }

        let munged = SessionDescription {
            kind: desc.kind,
            sdp: strip_rtx(&desc.sdp),
        };
        self.pending_local = Some(munged.clone());
        self.endpoint.set_local_description(munged);

        if desc.kind == SdpKind::Offer {
            self.set_state(NegotiationState::OfferSent);
        }

        Ok(())
    }

    /// The endpoint applied our local description: transmit those bytes.
    fn on_local_description_applied(&mut self, kind: SdpKind) -> Result<()> {
        match (&self.state, kind) {
            (NegotiationState::OfferSent, SdpKind::Offer) => {
                let Some(desc) = self.pending_local.take() else {
                    warn!(session_id = %self.session_id, "No pending offer to transmit");
                    return Ok(());
                };
                self.send_signal(SignalMessage::Offer { sdp: desc.sdp })?;
                self.set_state(NegotiationState::AwaitingAnswer);
                Ok(())
            }
            (NegotiationState::AnswerCreated, SdpKind::Answer) => {
                let Some(desc) = self.pending_local.take() else {
                    warn!(session_id = %self.session_id, "No pending answer to transmit");
                    return Ok(());
                };
                self.send_signal(SignalMessage::Answer { sdp: desc.sdp })?;
                self.set_state(NegotiationState::Negotiated);
                Ok(())
            }
            _ => {
                debug!(
                    session_id = %self.session_id,
                    state = ?self.state,
                    "Ignoring local {:?} description confirmation",
                    kind
                );
                Ok(())
            }
        }
    }

    /// The endpoint applied a remote description.
    fn on_remote_description_applied(&mut self, kind: SdpKind) -> Result<()> {
        match (&self.state, kind) {
            (NegotiationState::RemoteOfferReceived, SdpKind::Offer) => {
                self.endpoint.create_answer();
                self.set_state(NegotiationState::AnswerCreated);
                Ok(())
            }
            (NegotiationState::AwaitingAnswer, SdpKind::Answer) => {
                info!(session_id = %self.session_id, "Remote answer applied");
                self.set_state(NegotiationState::Negotiated);
                Ok(())
            }
            _ => {
                debug!(
                    session_id = %self.session_id,
                    state = ?self.state,
                    "Ignoring remote {:?} description confirmation",
                    kind
                );
                Ok(())
            }
        }
    }

    fn on_remote_offer(&mut self, sdp: String) -> Result<()> {
        match self.state {
            NegotiationState::Idle | NegotiationState::AwaitingAnswer => {
                if self.state == NegotiationState::AwaitingAnswer {
                    // Glare: the remote offered while ours is in flight. No
                    // polite/impolite resolution; the remote offer replaces
                    // our round.
                    warn!(session_id = %self.session_id, "Remote offer received while awaiting answer");
                    self.pending_local = None;
                }
                self.endpoint
                    .set_remote_description(SessionDescription::offer(sdp));
                self.set_state(NegotiationState::RemoteOfferReceived);
                Ok(())
            }
            _ => {
                warn!(
                    session_id = %self.session_id,
                    state = ?self.state,
                    "Ignoring remote offer"
                );
                Ok(())
            }
        }
    }

    fn on_remote_answer(&mut self, sdp: String) -> Result<()> {
        if self.state != NegotiationState::AwaitingAnswer {
            warn!(
                session_id = %self.session_id,
                state = ?self.state,
                "Ignoring remote answer"
            );
            return Ok(());
        }

        self.endpoint
            .set_remote_description(SessionDescription::answer(sdp));
        Ok(())
    }

    /// Forward a locally gathered candidate to the remote peer
    fn send_candidate(&mut self, candidate: IceCandidate) -> Result<()> {
        debug!(
            session_id = %self.session_id,
            "Local ICE candidate: {}",
            candidate.candidate
        );
        self.send_signal(SignalMessage::Candidate {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
        })
    }

    /// Encode and transmit one signaling message
    fn send_signal(&mut self, message: SignalMessage) -> Result<()> {
        let json = message.to_json()?;
        if let Err(e) = self.sender.send(json) {
            self.pending_local = None;
            self.state = NegotiationState::Failed(e.to_string());
            return Err(e);
        }
        Ok(())
    }

    /// Abort the round: discard the held description, record the failure and
    /// hand the reason upward. No automatic retry.
    fn fail(&mut self, op: NegotiationOp, reason: String) -> Error {
        error!(
            session_id = %self.session_id,
            "Negotiation failed during {}: {}",
            op, reason
        );
        self.pending_local = None;
        self.state = NegotiationState::Failed(reason.clone());
        Error::Negotiation { op, reason }
    }

    fn set_state(&mut self, next: NegotiationState) {
        if self.state != next {
            debug!(
                session_id = %self.session_id,
                "Negotiation state: {:?} -> {:?}",
                self.state, next
            );
            self.state = next;
        }
    }
}
