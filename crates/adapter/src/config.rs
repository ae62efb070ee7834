//! Gateway configuration shared by the client and the host.

use std::time::Duration;

use crate::protocol::PROTOCOL_VERSION;

/// Default gateway port (the conventional local gateway port).
pub const DEFAULT_PORT: u16 = 25333;

/// Default bound on establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub connect_timeout: Duration,
    /// Per-call bound for client requests. `None` blocks until the gateway answers.
    pub call_timeout: Option<Duration>,
    /// Host-side wire log (one JSON line per message in both directions).
    pub log_path: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            protocol_version: PROTOCOL_VERSION.to_string(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            call_timeout: None,
            log_path: None,
        }
    }
}

impl GatewayConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|s| s.trim().to_string())
                .and_then(|s| if s.is_empty() { None } else { Some(s) })
        };

        let defaults = Self::default();

        let host = get("TAREBOT_GATEWAY_HOST").unwrap_or(defaults.host);
        let port = get("TAREBOT_GATEWAY_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);
        let connect_timeout = get("TAREBOT_CONNECT_TIMEOUT_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.connect_timeout);
        let call_timeout = get("TAREBOT_CALL_TIMEOUT_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis);
        let log_path = get("TAREBOT_GATEWAY_LOG_PATH");

        Self {
            host,
            port,
            protocol_version: defaults.protocol_version,
            connect_timeout,
            call_timeout,
            log_path,
        }
    }

    /// `host:port`, resolved by the socket layer.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
