//! Client error types.

use thiserror::Error;
use transom_core::ProtocolError;

use crate::channel::ChannelError;

/// Errors from driving a storage request.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The negotiation itself failed (timeout, not found, platform error).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The channel could not deliver a post.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The inbound event stream ended while a request was in flight.
    #[error("window event stream closed")]
    EventsClosed,
}

impl ClientError {
    /// Whether this is a protocol-level timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Protocol(error) if error.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_pass_through_display() {
        let error: ClientError = ProtocolError::not_found("Capabilities not found").into();
        assert_eq!(error.to_string(), "Capabilities not found");
        assert!(!error.is_timeout());
    }

    #[test]
    fn timeout_detection() {
        let error: ClientError = ProtocolError::Timeout { waited_ms: 1000 }.into();
        assert!(error.is_timeout());
    }
}
