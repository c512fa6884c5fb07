//! Server configuration, read from flags or environment.

use crate::tree::{OddNodePolicy, DEFAULT_PREVIEW_LEN};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Largest number of records accepted by one build request
pub const DEFAULT_MAX_RECORDS: usize = 200;

/// Largest number of sessions holding a tree at once
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "merkle-demo", version, about = "Merkle tree proof demonstration server")]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "MERKLE_DEMO_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "MERKLE_DEMO_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Maximum records per build request
    #[arg(long, env = "MERKLE_DEMO_MAX_RECORDS", default_value_t = DEFAULT_MAX_RECORDS)]
    pub max_records: usize,

    /// Maximum sessions holding a tree at once
    #[arg(long, env = "MERKLE_DEMO_MAX_SESSIONS", default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    /// Hex characters shown in hash previews
    #[arg(long, env = "MERKLE_DEMO_PREVIEW_LEN", default_value_t = DEFAULT_PREVIEW_LEN)]
    pub preview_len: usize,

    /// How odd levels are completed: `duplicate` or `promote`
    #[arg(long, env = "MERKLE_DEMO_ODD_POLICY", default_value_t = OddNodePolicy::DuplicateLast)]
    pub odd_policy: OddNodePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            max_records: DEFAULT_MAX_RECORDS,
            max_sessions: DEFAULT_MAX_SESSIONS,
            preview_len: DEFAULT_PREVIEW_LEN,
            odd_policy: OddNodePolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let config = ServerConfig::try_parse_from([
            "merkle-demo",
            "--port",
            "8080",
            "--max-records",
            "10",
            "--max-sessions",
            "4",
            "--odd-policy",
            "promote",
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_records, 10);
        assert_eq!(config.max_sessions, 4);
        assert_eq!(config.odd_policy, OddNodePolicy::PromoteAlone);
        assert_eq!(config.preview_len, DEFAULT_PREVIEW_LEN);
        assert_eq!(ServerConfig::default().max_sessions, DEFAULT_MAX_SESSIONS);
        assert_eq!(config.socket_addr().port(), 8080);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result = ServerConfig::try_parse_from(["merkle-demo", "--odd-policy", "sideways"]);
        assert!(result.is_err());
    }
}
