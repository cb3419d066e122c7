//! Configuration types for a negotiation session

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which side of the session this peer plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    /// Creates and sends the offer as soon as signaling connects
    Caller,
    /// Waits for a remote offer and answers it
    Callee,
}

/// Main configuration for a negotiation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// WebSocket signaling server URL (ws:// or wss://)
    pub signaling_url: String,

    /// STUN server URLs (at least one required)
    pub stun_servers: Vec<String>,

    /// TURN server configurations (optional)
    pub turn_servers: Vec<TurnServerConfig>,

    /// Role this peer plays in the offer/answer exchange
    pub role: SessionRole,

    /// Optional deadline for a single negotiation round; `None` waits forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negotiation_timeout: Option<Duration>,
}

/// TURN server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnServerConfig {
    /// TURN server URL (turn:// or turns://)
    pub url: String,

    /// Username for TURN authentication
    pub username: String,

    /// Credential for TURN authentication
    pub credential: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signaling_url: "ws://localhost:8080/signal".to_string(),
            stun_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            turn_servers: Vec::new(),
            role: SessionRole::Caller,
            negotiation_timeout: None,
        }
    }
}

impl SessionConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `stun_servers` is empty
    /// - `signaling_url` is not a valid WebSocket URL
    /// - `negotiation_timeout` is zero
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if self.stun_servers.is_empty() {
            return Err(Error::InvalidConfig(
                "At least one STUN server is required".to_string(),
            ));
        }

        if !self.signaling_url.starts_with("ws://") && !self.signaling_url.starts_with("wss://") {
            return Err(Error::InvalidConfig(format!(
                "signaling_url must start with ws:// or wss://, got {}",
                self.signaling_url
            )));
        }

        if self.negotiation_timeout == Some(Duration::ZERO) {
            return Err(Error::InvalidConfig(
                "negotiation_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Create a configuration for a same-network session
    ///
    /// STUN is still configured (host candidates usually suffice on a LAN,
    /// but some access points block peer-to-peer traffic), and the round is
    /// bounded so a dead signaling peer surfaces quickly.
    pub fn lan_preset(signaling_url: &str, role: SessionRole) -> Self {
        Self {
            signaling_url: signaling_url.to_string(),
            stun_servers: vec!["stun:stun.l.google.com:19302".to_string()],
            turn_servers: Vec::new(),
            role,
            negotiation_timeout: Some(Duration::from_secs(15)),
        }
    }

    /// Add TURN servers to this configuration
    pub fn with_turn_servers(mut self, turn_servers: Vec<TurnServerConfig>) -> Self {
        self.turn_servers = turn_servers;
        self
    }

    /// Set the role for this configuration
    pub fn with_role(mut self, role: SessionRole) -> Self {
        self.role = role;
        self
    }

    /// Set the per-round negotiation deadline
    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_stun_servers_fails() {
        let mut config = SessionConfig::default();
        config.stun_servers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_signaling_url_fails() {
        let mut config = SessionConfig::default();
        config.signaling_url = "http://localhost:8080".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_fails() {
        let config = SessionConfig::default().with_negotiation_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lan_preset() {
        let config = SessionConfig::lan_preset("ws://192.168.0.10:8080/signal", SessionRole::Callee);
        assert!(config.validate().is_ok());
        assert_eq!(config.role, SessionRole::Callee);
        assert_eq!(config.negotiation_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_builder_chain() {
        let config = SessionConfig::default()
            .with_role(SessionRole::Callee)
            .with_turn_servers(vec![TurnServerConfig {
                url: "turn:turn.example.com:3478".to_string(),
                username: "user".to_string(),
                credential: "pass".to_string(),
            }]);
        assert!(config.validate().is_ok());
        assert_eq!(config.role, SessionRole::Callee);
        assert_eq!(config.turn_servers.len(), 1);
    }

    #[test]
    fn test_config_serialization() {
        let config = SessionConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.signaling_url, deserialized.signaling_url);
        assert_eq!(config.role, deserialized.role);
    }
}
