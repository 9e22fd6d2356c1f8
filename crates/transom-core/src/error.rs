//! Protocol error types.

use thiserror::Error;
use transom_proto::ErrorInfo;

/// Failures a storage exchange can settle with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// No matching response arrived within the configured deadline.
    #[error("no response received after {waited_ms}ms")]
    Timeout {
        /// How long the exchange waited, in milliseconds.
        waited_ms: u64,
    },

    /// Capability negotiation found nothing usable.
    #[error("{message}")]
    NotFound {
        /// Description of what was missing.
        message: String,
    },

    /// The platform answered with an error payload.
    ///
    /// Code and message are carried verbatim from the wire.
    #[error("platform error {code}: {message}")]
    Platform {
        /// Platform-supplied error code.
        code: String,
        /// Platform-supplied description.
        message: String,
    },
}

impl ProtocolError {
    /// Build a `NotFound` error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound { message: message.into() }
    }

    /// Wire-level error code for this failure.
    pub fn code(&self) -> &str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::NotFound { .. } => "not_found",
            Self::Platform { code, .. } => code,
        }
    }

    /// Whether this failure is a correlation timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<ErrorInfo> for ProtocolError {
    fn from(info: ErrorInfo) -> Self {
        Self::Platform { code: info.code, message: info.message }
    }
}
