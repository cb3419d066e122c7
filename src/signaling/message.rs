//! Signaling message codec

use serde::{Deserialize, Serialize};

/// A signaling message exchanged with the remote peer
///
/// Decoding is total: anything that is not a well-formed offer, answer or
/// candidate object comes back as [`SignalMessage::Unknown`] so a hostile or
/// buggy peer can never take down the receive loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalMessage {
    /// Session description offer
    Offer {
        /// SDP text
        sdp: String,
    },

    /// Session description answer
    Answer {
        /// SDP text
        sdp: String,
    },

    /// Trickled ICE candidate
    Candidate {
        /// ICE candidate line
        candidate: String,

        /// Media section identifier; empty when the sender had none
        #[serde(rename = "sdpMid", default)]
        sdp_mid: String,

        /// Media line index
        #[serde(rename = "sdpMLineIndex")]
        sdp_mline_index: i32,
    },

    /// Anything the codec did not recognize; ignored by the state machine
    #[serde(skip)]
    Unknown {
        /// The raw frame text, kept for diagnostics
        raw: String,
    },
}

impl SignalMessage {
    /// Convert message to JSON wire text
    ///
    /// Serializing [`SignalMessage::Unknown`] is an error: it exists only on
    /// the decode side.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| {
            crate::Error::Serialization(format!("Failed to serialize signaling message: {}", e))
        })
    }

    /// Parse message from JSON wire text, reporting the decode diagnostic
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            crate::Error::Serialization(format!("Failed to deserialize signaling message: {}", e))
        })
    }

    /// Parse message from JSON wire text, never failing
    ///
    /// Malformed JSON, a missing/unrecognized `type`, or missing required
    /// fields all yield [`SignalMessage::Unknown`].
    pub fn from_json_lossy(json: &str) -> Self {
        Self::from_json(json).unwrap_or_else(|_| SignalMessage::Unknown {
            raw: json.to_string(),
        })
    }

    /// The wire `type` tag, if this message has one
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            SignalMessage::Offer { .. } => Some("offer"),
            SignalMessage::Answer { .. } => Some("answer"),
            SignalMessage::Candidate { .. } => Some("candidate"),
            SignalMessage::Unknown { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_roundtrip() {
        let msg = SignalMessage::Offer {
            sdp: "v=0\no=- ...".to_string(),
        };

        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"offer\""));
        let parsed = SignalMessage::from_json(&json).unwrap();
        assert_eq!(msg, parsed);
    }

    #[test]
    fn test_candidate_decode_with_fields() {
        let json = r#"{"type":"candidate","sdpMid":"0","sdpMLineIndex":0,"candidate":"candidate:1 1 udp 2130706431 192.168.0.10 54321 typ host"}"#;
        let msg = SignalMessage::from_json_lossy(json);

        assert_eq!(
            msg,
            SignalMessage::Candidate {
                candidate: "candidate:1 1 udp 2130706431 192.168.0.10 54321 typ host".to_string(),
                sdp_mid: "0".to_string(),
                sdp_mline_index: 0,
            }
        );
    }

    #[test]
    fn test_candidate_encode_wire_field_names() {
        let msg = SignalMessage::Candidate {
            candidate: "candidate:...".to_string(),
            sdp_mid: "video".to_string(),
            sdp_mline_index: 1,
        };

        let json = msg.to_json().unwrap();
        assert!(json.contains("\"sdpMid\":\"video\""));
        assert!(json.contains("\"sdpMLineIndex\":1"));
    }

    #[test]
    fn test_candidate_sdp_mid_defaults_to_empty() {
        let json = r#"{"type":"candidate","sdpMLineIndex":0,"candidate":"candidate:..."}"#;
        match SignalMessage::from_json_lossy(json) {
            SignalMessage::Candidate { sdp_mid, .. } => assert_eq!(sdp_mid, ""),
            other => panic!("expected candidate, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_type_is_unknown() {
        let json = r#"{"type":"bogus"}"#;
        assert_eq!(
            SignalMessage::from_json_lossy(json),
            SignalMessage::Unknown {
                raw: json.to_string()
            }
        );
    }

    #[test]
    fn test_malformed_json_is_unknown() {
        for raw in ["not json at all", "{\"type\":", "[1,2,3]", "", "{}"] {
            match SignalMessage::from_json_lossy(raw) {
                SignalMessage::Unknown { raw: kept } => assert_eq!(kept, raw),
                other => panic!("expected unknown for {:?}, got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_missing_required_field_is_unknown() {
        // candidate without sdpMLineIndex
        let json = r#"{"type":"candidate","candidate":"candidate:..."}"#;
        assert!(matches!(
            SignalMessage::from_json_lossy(json),
            SignalMessage::Unknown { .. }
        ));
    }

    #[test]
    fn test_unknown_does_not_serialize() {
        let msg = SignalMessage::Unknown {
            raw: "junk".to_string(),
        };
        assert!(msg.to_json().is_err());
    }

    #[test]
    fn test_type_name() {
        assert_eq!(
            SignalMessage::Answer { sdp: String::new() }.type_name(),
            Some("answer")
        );
        assert_eq!(
            SignalMessage::Unknown { raw: String::new() }.type_name(),
            None
        );
    }
}
