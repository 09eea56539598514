//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::game::score::DEFAULT_WIN_THRESHOLD;
use crate::game::Role;
use crate::ws::protocol::PlayerId;

/// Peer configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Host or guest
    pub role: Role,
    /// This peer's player id
    pub peer_id: PlayerId,
    /// Host binding address
    pub listen_addr: SocketAddr,
    /// WebSocket URL of the host, guest only
    pub host_url: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Points needed to win
    pub win_threshold: u32,
    /// Coin flip seed; random when unset
    pub match_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let role = match lookup("PEER_ROLE").as_deref() {
            Some("host") => Role::Host,
            Some("guest") => Role::Guest,
            Some(_) => return Err(ConfigError::Invalid("PEER_ROLE")),
            None => return Err(ConfigError::Missing("PEER_ROLE")),
        };

        let peer_id = lookup("PEER_ID")
            .filter(|id| !id.trim().is_empty())
            .map(PlayerId::new)
            .unwrap_or_else(|| PlayerId::new(uuid::Uuid::new_v4().to_string()));

        // PORT wins over LISTEN_ADDR, same as hosted platforms expect
        let listen_addr = if let Some(port) = lookup("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            lookup("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:7878".to_string())
        };
        let listen_addr = listen_addr
            .parse()
            .map_err(|_| ConfigError::Invalid("LISTEN_ADDR"))?;

        let host_url = lookup("HOST_URL");
        if role == Role::Guest && host_url.is_none() {
            return Err(ConfigError::Missing("HOST_URL"));
        }

        let win_threshold = match lookup("WIN_THRESHOLD") {
            Some(v) => v
                .parse::<u32>()
                .ok()
                .filter(|t| *t > 0)
                .ok_or(ConfigError::Invalid("WIN_THRESHOLD"))?,
            None => DEFAULT_WIN_THRESHOLD,
        };

        let match_seed = lookup("MATCH_SEED")
            .map(|v| v.parse::<u64>().map_err(|_| ConfigError::Invalid("MATCH_SEED")))
            .transpose()?;

        Ok(Self {
            role,
            peer_id,
            listen_addr,
            host_url,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            win_threshold,
            match_seed,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_host_defaults() {
        let config = load(&[("PEER_ROLE", "host")]).unwrap();
        assert_eq!(config.role, Role::Host);
        assert_eq!(config.listen_addr.port(), 7878);
        assert_eq!(config.win_threshold, 5);
        assert_eq!(config.match_seed, None);
        assert!(!config.peer_id.as_str().is_empty());
    }

    #[test]
    fn test_port_overrides_listen_addr() {
        let config = load(&[
            ("PEER_ROLE", "host"),
            ("LISTEN_ADDR", "127.0.0.1:9000"),
            ("PORT", "4000"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr.port(), 4000);
    }

    #[test]
    fn test_guest_needs_host_url() {
        assert!(matches!(
            load(&[("PEER_ROLE", "guest")]),
            Err(ConfigError::Missing("HOST_URL"))
        ));
        let config = load(&[
            ("PEER_ROLE", "guest"),
            ("HOST_URL", "ws://127.0.0.1:7878/ws"),
            ("PEER_ID", "B"),
            ("MATCH_SEED", "42"),
        ])
        .unwrap();
        assert_eq!(config.peer_id.as_str(), "B");
        assert_eq!(config.match_seed, Some(42));
    }

    #[test]
    fn test_bad_values() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("PEER_ROLE"))));
        assert!(matches!(
            load(&[("PEER_ROLE", "spectator")]),
            Err(ConfigError::Invalid("PEER_ROLE"))
        ));
        assert!(matches!(
            load(&[("PEER_ROLE", "host"), ("WIN_THRESHOLD", "0")]),
            Err(ConfigError::Invalid("WIN_THRESHOLD"))
        ));
        assert!(matches!(
            load(&[("PEER_ROLE", "host"), ("LISTEN_ADDR", "nowhere")]),
            Err(ConfigError::Invalid("LISTEN_ADDR"))
        ));
    }
}
