//! Tagged decode of inbound window messages.
//!
//! Anything can arrive on a window's message listener: other tools'
//! messages, platform chatter, or hostile noise. Inbound payloads are
//! therefore validated and classified into a closed set of variants before
//! any correlation or dispatch happens, instead of field-poking at untyped
//! data at each use site.

use serde::Deserialize;
use serde_json::Value;

use crate::message::{CapabilityDescriptor, ErrorInfo, MessageId, ResponseMessage};
use crate::subject::{RESPONSE_SUFFIX, Subject};

/// Response to a capabilities query.
///
/// `supported_messages` stays optional at this layer: a platform answering
/// the capabilities subject without a capability list is still a correlated
/// response, and the prober decides that it is a `not_found` failure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CapabilityResponse {
    /// Capabilities request subject with `.response` appended.
    pub subject: String,
    /// Echo of the request's correlation ID.
    pub message_id: MessageId,
    /// Advertised capability entries, when present.
    #[serde(default)]
    pub supported_messages: Option<Vec<CapabilityDescriptor>>,
    /// Platform-reported failure, if any.
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

/// Why a payload failed classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnrecognizedReason {
    /// The payload is not a JSON object.
    NotAnObject,
    /// No string `subject` field.
    MissingSubject,
    /// No string `message_id` field.
    MissingMessageId,
    /// The subject does not end in `.response`, so it is not an answer to
    /// anything this side sent.
    NotAResponse,
    /// The shape did not deserialize as any known response variant.
    MalformedFields,
}

impl std::fmt::Display for UnrecognizedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NotAnObject => "payload is not an object",
            Self::MissingSubject => "missing subject",
            Self::MissingMessageId => "missing message_id",
            Self::NotAResponse => "subject is not a response",
            Self::MalformedFields => "malformed response fields",
        };
        f.write_str(text)
    }
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A put/get response.
    Response(ResponseMessage),
    /// A capabilities response.
    Capabilities(CapabilityResponse),
    /// Anything else; ignored by every exchange.
    Unrecognized(UnrecognizedReason),
}

impl Incoming {
    /// Correlation ID of the message, when it has one.
    pub fn message_id(&self) -> Option<&MessageId> {
        match self {
            Self::Response(response) => Some(&response.message_id),
            Self::Capabilities(capabilities) => Some(&capabilities.message_id),
            Self::Unrecognized(_) => None,
        }
    }

    /// Wire subject of the message, when it has one.
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Response(response) => Some(&response.subject),
            Self::Capabilities(capabilities) => Some(&capabilities.subject),
            Self::Unrecognized(_) => None,
        }
    }
}

/// Classify one inbound payload.
///
/// Total over arbitrary JSON: malformed input yields
/// [`Incoming::Unrecognized`], never an error or a panic.
pub fn classify(payload: &Value) -> Incoming {
    let Some(object) = payload.as_object() else {
        return Incoming::Unrecognized(UnrecognizedReason::NotAnObject);
    };

    let Some(subject) = object.get("subject").and_then(Value::as_str) else {
        return Incoming::Unrecognized(UnrecognizedReason::MissingSubject);
    };

    if !object.get("message_id").is_some_and(Value::is_string) {
        return Incoming::Unrecognized(UnrecognizedReason::MissingMessageId);
    }

    let Some(request_subject) = subject.strip_suffix(RESPONSE_SUFFIX) else {
        return Incoming::Unrecognized(UnrecognizedReason::NotAResponse);
    };

    if Subject::Capabilities.matches(request_subject) {
        return serde_json::from_value::<CapabilityResponse>(payload.clone())
            .map_or(Incoming::Unrecognized(UnrecognizedReason::MalformedFields), |capabilities| {
                Incoming::Capabilities(capabilities)
            });
    }

    serde_json::from_value::<ResponseMessage>(payload.clone())
        .map_or(Incoming::Unrecognized(UnrecognizedReason::MalformedFields), Incoming::Response)
}
