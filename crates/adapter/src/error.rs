//! Error type for gateway calls.

use crate::protocol::ErrorCode;

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The gateway could not be reached, the handshake failed, or the
    /// connection dropped.
    Connection(String),
    /// The gateway answered the call with an error reply.
    RemoteCall { code: ErrorCode, message: String },
    /// The gateway answered with a message that does not fit the request.
    Protocol(String),
    /// `decide` was called before the bot was initialized.
    NotInitialized,
    /// `initialize` was called on a bot that already holds an agent.
    AlreadyInitialized,
}

impl GatewayError {
    pub fn connection(msg: impl Into<String>) -> Self {
        GatewayError::Connection(msg.into())
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, GatewayError::Connection(_))
    }

    pub fn is_remote_call(&self) -> bool {
        matches!(self, GatewayError::RemoteCall { .. })
    }

    /// Remote error code, when the gateway supplied one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            GatewayError::RemoteCall { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Connection(msg) => write!(f, "gateway connection error: {msg}"),
            GatewayError::RemoteCall { code, message } => {
                write!(f, "remote call failed ({code}): {message}")
            }
            GatewayError::Protocol(msg) => write!(f, "gateway protocol error: {msg}"),
            GatewayError::NotInitialized => write!(f, "bot used before initialize"),
            GatewayError::AlreadyInitialized => write!(f, "bot is already initialized"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<std::io::Error> for GatewayError {
    fn from(e: std::io::Error) -> Self {
        GatewayError::Connection(e.to_string())
    }
}
