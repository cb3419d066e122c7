//! Endpoint seam and event channel types

use std::fmt;

/// Which role a session description plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    /// Offer side of the exchange
    Offer,
    /// Answer side of the exchange
    Answer,
}

/// A session description produced by or destined for the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    /// Offer or answer
    pub kind: SdpKind,
    /// SDP text
    pub sdp: String,
}

impl SessionDescription {
    /// An offer description
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    /// An answer description
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// An ICE candidate, locally gathered or remotely received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceCandidate {
    /// Candidate line
    pub candidate: String,
    /// Media section identifier; empty when unknown
    pub sdp_mid: String,
    /// Media line index
    pub sdp_mline_index: i32,
}

/// The endpoint operations whose failure aborts a negotiation round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationOp {
    /// Producing the local offer
    CreateOffer,
    /// Producing the local answer
    CreateAnswer,
    /// Applying the local description
    SetLocalDescription,
    /// Applying the remote description
    SetRemoteDescription,
}

impl fmt::Display for NegotiationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationOp::CreateOffer => "createOffer",
            NegotiationOp::CreateAnswer => "createAnswer",
            NegotiationOp::SetLocalDescription => "setLocalDescription",
            NegotiationOp::SetRemoteDescription => "setRemoteDescription",
        };
        f.write_str(name)
    }
}

/// Everything an endpoint reports back to the session loop
///
/// Completions, gathered candidates and observability callbacks all arrive
/// on one channel so a single consumer owns every state mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// `create_offer` completed
    OfferReady(SessionDescription),

    /// `create_answer` completed
    AnswerReady(SessionDescription),

    /// `set_local_description` completed
    LocalDescApplied(SdpKind),

    /// `set_remote_description` completed
    RemoteDescApplied(SdpKind),

    /// The endpoint gathered a local ICE candidate
    CandidateGathered(IceCandidate),

    /// Signaling state changed (observability only)
    SignalingChanged(String),

    /// ICE connection state changed (observability only)
    IceConnectionChanged(String),

    /// ICE gathering state changed (observability only)
    IceGatheringChanged(String),

    /// A remote media stream appeared (observability only)
    RemoteStreamAdded(String),

    /// A remote media stream went away (observability only)
    RemoteStreamRemoved(String),

    /// One of the four negotiation operations failed
    NegotiationFailed {
        /// The operation that failed
        op: NegotiationOp,
        /// Failure reason reported by the endpoint
        reason: String,
    },
}

/// The negotiation primitive seam
///
/// Dispatch methods never suspend the caller: each kicks off the underlying
/// operation and reports its outcome on the [`SessionEvent`] channel handed
/// to the endpoint at construction. `add_remote_candidate` is fire-and-forget;
/// a candidate the endpoint cannot apply is logged, never a round failure.
pub trait MediaEndpoint: Send + Sync {
    /// Start producing a local offer; completes as
    /// [`SessionEvent::OfferReady`] or [`SessionEvent::NegotiationFailed`]
    fn create_offer(&self);

    /// Start producing a local answer; completes as
    /// [`SessionEvent::AnswerReady`] or [`SessionEvent::NegotiationFailed`]
    fn create_answer(&self);

    /// Apply a local description; completes as
    /// [`SessionEvent::LocalDescApplied`] or [`SessionEvent::NegotiationFailed`]
    fn set_local_description(&self, desc: SessionDescription);

    /// Apply a remote description; completes as
    /// [`SessionEvent::RemoteDescApplied`] or [`SessionEvent::NegotiationFailed`]
    fn set_remote_description(&self, desc: SessionDescription);

    /// Apply a remote ICE candidate
    fn add_remote_candidate(&self, candidate: IceCandidate);

    /// Tear the endpoint down
    fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiation_op_display() {
        assert_eq!(NegotiationOp::CreateOffer.to_string(), "createOffer");
        assert_eq!(NegotiationOp::CreateAnswer.to_string(), "createAnswer");
        assert_eq!(
            NegotiationOp::SetLocalDescription.to_string(),
            "setLocalDescription"
        );
        assert_eq!(
            NegotiationOp::SetRemoteDescription.to_string(),
            "setRemoteDescription"
        );
    }

    #[test]
    fn test_session_description_constructors() {
        let offer = SessionDescription::offer("v=0");
        assert_eq!(offer.kind, SdpKind::Offer);
        assert_eq!(offer.sdp, "v=0");

        let answer = SessionDescription::answer("v=0");
        assert_eq!(answer.kind, SdpKind::Answer);
    }
}
