//! Error types for the bridge.

use std::time::Duration;

/// Errors raised by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Parent context not available")]
    Unavailable,

    #[error("Inbound listener already installed")]
    AlreadyListening,

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Transport closed")]
    Closed,
}

/// Errors surfaced by bridge operations.
///
/// Awaiting a request only ever yields [`BridgeError::Timeout`] or
/// [`BridgeError::Host`] under normal operation; the other variants describe
/// caller mistakes or a torn-down bridge.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    #[error("Request {kind} timed out after {}ms", timeout.as_millis())]
    Timeout { kind: String, timeout: Duration },

    #[error("Host rejected {kind}: {message}")]
    Host { kind: String, message: String },

    #[error("Invalid payload for {kind}: {reason}")]
    InvalidPayload { kind: String, reason: String },

    #[error("Unexpected reply for {kind}: {reason}")]
    Decode { kind: String, reason: String },

    #[error("Bridge closed before a reply arrived")]
    Closed,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl BridgeError {
    /// True when no reply arrived before the deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout { .. })
    }

    /// The host's failure message, verbatim.
    pub fn host_message(&self) -> Option<&str> {
        match self {
            BridgeError::Host { message, .. } => Some(message),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
