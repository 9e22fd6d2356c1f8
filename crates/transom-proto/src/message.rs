//! Request and response message payloads.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::subject::Subject;

/// Entropy drawn for each message ID, in bytes.
///
/// 15 bytes encode to exactly 20 base64url characters with no padding, which
/// keeps IDs compact while staying far beyond collision range for the
/// handful of exchanges a launch performs.
pub const MESSAGE_ID_ENTROPY_LEN: usize = 15;

/// Correlation ID carried by every sent message.
///
/// Every outgoing request draws fresh entropy; a response is only accepted if
/// it echoes the ID of the request it answers. The caller supplies the random
/// bytes so that ID generation stays deterministic under a seeded
/// environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Build an ID from caller-provided entropy.
    pub fn from_entropy(entropy: &[u8; MESSAGE_ID_ENTROPY_LEN]) -> Self {
        Self(format!("message-{}", URL_SAFE_NO_PAD.encode(entropy)))
    }

    /// The wire representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error payload a platform attaches to a failed response.
///
/// Carried verbatim to the caller; the protocol layer never rewrites a
/// platform-supplied code or message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Machine-readable error code, e.g. `key_not_found`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl ErrorInfo {
    /// Convenience constructor.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

/// Outgoing request posted to the platform window.
///
/// The `subject` is a wire string rather than a [`Subject`] because
/// capability negotiation may rewrite it into the legacy namespace before it
/// is posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    /// Wire subject of the requested operation.
    pub subject: String,
    /// Fresh correlation ID for this exchange.
    pub message_id: MessageId,
    /// Storage key, for put/get requests.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub key: Option<String>,
    /// Value to store, for put requests.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<String>,
}

impl RequestMessage {
    /// Capabilities query.
    pub fn capabilities(message_id: MessageId) -> Self {
        Self {
            subject: Subject::Capabilities.name().to_owned(),
            message_id,
            key: None,
            value: None,
        }
    }

    /// Legacy-namespaced capabilities query.
    pub fn capabilities_legacy(message_id: MessageId) -> Self {
        Self {
            subject: Subject::Capabilities.legacy_name(),
            message_id,
            key: None,
            value: None,
        }
    }

    /// Store `value` under `key`.
    pub fn put_data(message_id: MessageId, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            subject: Subject::PutData.name().to_owned(),
            message_id,
            key: Some(key.into()),
            value: Some(value.into()),
        }
    }

    /// Retrieve the value stored under `key`.
    pub fn get_data(message_id: MessageId, key: impl Into<String>) -> Self {
        Self {
            subject: Subject::GetData.name().to_owned(),
            message_id,
            key: Some(key.into()),
            value: None,
        }
    }

    /// Serialize for posting.
    pub fn to_value(&self) -> serde_json::Value {
        // Serialization of a plain struct with string fields cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Response to a put/get request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Request subject with `.response` appended.
    pub subject: String,
    /// Echo of the request's correlation ID.
    pub message_id: MessageId,
    /// Echo of the storage key, when the platform provides it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub key: Option<String>,
    /// Stored value; absent when the key holds nothing.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<String>,
    /// Platform-reported failure, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ErrorInfo>,
}

/// One entry of a platform's advertised capability set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Wire subject the platform accepts, in whichever namespace it
    /// implements.
    pub subject: String,
    /// Named frame to target for this subject instead of the launch window.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub frame: Option<String>,
}

/// The advertised capability set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityList {
    /// Subjects the platform supports, with optional per-subject frames.
    pub supported_messages: Vec<CapabilityDescriptor>,
}

impl CapabilityList {
    /// First advertised entry matching a logical subject, if any.
    pub fn find(&self, subject: Subject) -> Option<&CapabilityDescriptor> {
        self.supported_messages.iter().find(|entry| subject.matches(&entry.subject))
    }
}
