//! One-shot request/response correlation.
//!
//! An [`Exchange`] owns exactly one outgoing message and waits for the one
//! response that correlates with it. Each call constructs its own exchange;
//! there is no shared listener state, so any number of exchanges can be in
//! flight across instances without observing each other's traffic.
//!
//! Correlation gates, in order:
//!
//! 1. `message_id` must echo the request's ID — everything else is ignored
//!    (other in-flight exchanges may want it)
//! 2. when the origin policy is [`OriginPolicy::Exact`], a mismatched origin
//!    is ignored, not an error — a forged response must not consume the
//!    exchange
//! 3. `subject` must equal the request subject plus `.response`
//! 4. an `error` payload settles the exchange with the platform's error,
//!    verbatim
//!
//! The exchange settles exactly once: by matching response, by platform
//! error, or by deadline.

use std::time::{Duration, Instant};

use serde_json::Value;
use transom_proto::{CapabilityResponse, Incoming, MessageId, RequestMessage, ResponseMessage,
    response_subject};

use crate::error::ProtocolError;
use crate::log::ExchangeLog;

/// Default window to wait for a response before settling with a timeout.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Tunable knobs for a single exchange.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeConfig {
    /// How long to wait for a correlated response.
    pub response_timeout: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self { response_timeout: DEFAULT_RESPONSE_TIMEOUT }
    }
}

/// Which origins a response may arrive from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Accept any origin. Used for capability probes, where the platform
    /// origin is not yet pinned.
    Any,
    /// Accept only this origin; anything else is ignored.
    Exact(String),
}

impl OriginPolicy {
    /// The origin string to pass to the posting side (`*` for [`Self::Any`]).
    pub fn wire_target(&self) -> &str {
        match self {
            Self::Any => "*",
            Self::Exact(origin) => origin,
        }
    }

    fn accepts(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => origin == expected,
        }
    }
}

/// Which window a message should be posted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameTarget {
    /// The window that launched the tool: its opener if present, else its
    /// parent.
    Launch,
    /// A named frame within the launch window, as advertised by the
    /// platform's capabilities. Posting sides fall back to the launch
    /// window when no frame with this name exists.
    Named(String),
}

/// An outgoing post for the channel to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRequest {
    /// Window to deliver to.
    pub target: FrameTarget,
    /// Origin restriction for delivery (`*` means unrestricted).
    pub target_origin: String,
    /// JSON payload of the request message.
    pub payload: Value,
}

/// Payload an exchange settles with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    /// A put/get response.
    Data(ResponseMessage),
    /// A capabilities response.
    Capabilities(CapabilityResponse),
}

/// Why an inbound message was not consumed by this exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The message correlates with some other exchange.
    MessageIdMismatch,
    /// The message arrived from an origin the policy rejects.
    OriginMismatch,
    /// The message ID matched but the subject is not this request's
    /// response subject.
    SubjectMismatch,
    /// The payload failed classification entirely.
    Unrecognized,
    /// The exchange already settled.
    Closed,
}

/// Result of feeding one inbound message to an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Keep waiting; the message was not for this exchange (or was noise).
    Ignored(IgnoreReason),
    /// The exchange settled with this outcome.
    Settled(Result<ResponsePayload, ProtocolError>),
}

/// One in-flight request/response pair.
#[derive(Debug)]
pub struct Exchange {
    wire_subject: String,
    expected_subject: String,
    message_id: MessageId,
    origin: OriginPolicy,
    deadline: Instant,
    timeout: Duration,
    settled: bool,
    log: ExchangeLog,
}

impl Exchange {
    /// Open an exchange, arming its deadline and producing the post action.
    pub fn open(
        request: &RequestMessage,
        target: FrameTarget,
        origin: OriginPolicy,
        now: Instant,
        config: &ExchangeConfig,
        debug: bool,
    ) -> (Self, PostRequest) {
        let payload = request.to_value();
        let mut log = ExchangeLog::new(debug, now);
        log.record_request(
            now,
            &request.subject,
            request.message_id.as_str(),
            &target,
            origin.wire_target(),
            &payload,
        );

        let exchange = Self {
            wire_subject: request.subject.clone(),
            expected_subject: response_subject(&request.subject),
            message_id: request.message_id.clone(),
            origin: origin.clone(),
            deadline: now + config.response_timeout,
            timeout: config.response_timeout,
            settled: false,
            log,
        };
        let post = PostRequest {
            target,
            target_origin: origin.wire_target().to_owned(),
            payload,
        };
        (exchange, post)
    }

    /// The correlation ID this exchange waits on.
    pub fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    /// The wire subject that was posted.
    pub fn wire_subject(&self) -> &str {
        &self.wire_subject
    }

    /// When the exchange times out if nothing correlates.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Whether the exchange has already settled.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Feed one classified inbound message.
    ///
    /// `raw` is the original payload, kept for diagnostics.
    pub fn handle_incoming(
        &mut self,
        now: Instant,
        origin: &str,
        incoming: &Incoming,
        raw: &Value,
    ) -> Disposition {
        if self.settled {
            return Disposition::Ignored(IgnoreReason::Closed);
        }

        let Some(message_id) = incoming.message_id() else {
            return Disposition::Ignored(IgnoreReason::Unrecognized);
        };

        if message_id != &self.message_id {
            self.log.record_error(
                now,
                format!(
                    "ignoring message, invalid message_id: [{message_id}] expected: [{}]",
                    self.message_id
                ),
            );
            return Disposition::Ignored(IgnoreReason::MessageIdMismatch);
        }

        self.log.record_response(now, origin, raw);

        if !self.origin.accepts(origin) {
            self.log.record_error(now, format!("ignoring message, invalid origin: {origin}"));
            self.log.print();
            return Disposition::Ignored(IgnoreReason::OriginMismatch);
        }

        let subject = incoming.subject().unwrap_or_default();
        if subject != self.expected_subject {
            self.log.record_error(
                now,
                format!(
                    "ignoring message, invalid subject: [{subject}] expected: [{}]",
                    self.expected_subject
                ),
            );
            self.log.print();
            return Disposition::Ignored(IgnoreReason::SubjectMismatch);
        }

        let (payload, error) = match incoming {
            Incoming::Response(response) => {
                (ResponsePayload::Data(response.clone()), response.error.clone())
            },
            Incoming::Capabilities(capabilities) => {
                (ResponsePayload::Capabilities(capabilities.clone()), capabilities.error.clone())
            },
            // Unrecognized payloads carry no message ID and were ignored above.
            Incoming::Unrecognized(_) => return Disposition::Ignored(IgnoreReason::Unrecognized),
        };

        self.settled = true;
        if let Some(info) = error {
            self.log.record_error(now, format!("platform error {}: {}", info.code, info.message));
            self.log.print();
            return Disposition::Settled(Err(info.into()));
        }

        self.log.print();
        Disposition::Settled(Ok(payload))
    }

    /// Settle with a timeout once the deadline has passed.
    ///
    /// Returns `None` while the deadline is in the future or the exchange
    /// already settled — the timeout fires at the deadline, not before.
    pub fn poll_deadline(&mut self, now: Instant) -> Option<Result<ResponsePayload, ProtocolError>> {
        if self.settled || now < self.deadline {
            return None;
        }

        self.settled = true;
        let waited_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let error = ProtocolError::Timeout { waited_ms };
        self.log.record_error(now, error.to_string());
        self.log.print();
        Some(Err(error))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use transom_proto::{MESSAGE_ID_ENTROPY_LEN, classify};

    use super::*;

    fn message_id(seed: u8) -> MessageId {
        MessageId::from_entropy(&[seed; MESSAGE_ID_ENTROPY_LEN])
    }

    fn open_put(origin: OriginPolicy) -> (Exchange, PostRequest, Instant) {
        let now = Instant::now();
        let request = RequestMessage::put_data(message_id(1), "lti_state_abc", "abc");
        let (exchange, post) =
            Exchange::open(&request, FrameTarget::Launch, origin, now, &ExchangeConfig::default(), false);
        (exchange, post, now)
    }

    fn response_for(exchange: &Exchange) -> Value {
        json!({
            "subject": "lti.put_data.response",
            "message_id": exchange.message_id().as_str(),
            "key": "lti_state_abc",
            "value": "abc",
        })
    }

    fn feed(exchange: &mut Exchange, now: Instant, origin: &str, payload: &Value) -> Disposition {
        exchange.handle_incoming(now, origin, &classify(payload), payload)
    }

    #[test]
    fn post_carries_wire_fields() {
        let (exchange, post, _) = open_put(OriginPolicy::Exact("https://lms.example".to_owned()));
        assert_eq!(post.target, FrameTarget::Launch);
        assert_eq!(post.target_origin, "https://lms.example");
        assert_eq!(post.payload["subject"], "lti.put_data");
        assert_eq!(post.payload["message_id"], exchange.message_id().as_str());
    }

    #[test]
    fn settles_on_matching_response() {
        let (mut exchange, _, now) = open_put(OriginPolicy::Exact("https://lms.example".to_owned()));
        let payload = response_for(&exchange);

        match feed(&mut exchange, now, "https://lms.example", &payload) {
            Disposition::Settled(Ok(ResponsePayload::Data(response))) => {
                assert_eq!(response.value.as_deref(), Some("abc"));
                assert_eq!(&response.message_id, exchange.message_id());
            },
            other => panic!("expected settled data, got {other:?}"),
        }
        assert!(exchange.is_settled());
    }

    #[test]
    fn ignores_foreign_message_id() {
        let (mut exchange, _, now) = open_put(OriginPolicy::Any);
        let payload = json!({
            "subject": "lti.put_data.response",
            "message_id": message_id(9).as_str(),
        });

        assert_eq!(
            feed(&mut exchange, now, "https://lms.example", &payload),
            Disposition::Ignored(IgnoreReason::MessageIdMismatch)
        );
        assert!(!exchange.is_settled());
    }

    #[test]
    fn foreign_origin_is_ignored_not_fatal() {
        let (mut exchange, _, now) = open_put(OriginPolicy::Exact("https://lms.example".to_owned()));
        let payload = response_for(&exchange);

        // A forged response from elsewhere must neither settle nor poison
        // the exchange.
        assert_eq!(
            feed(&mut exchange, now, "https://evil.example", &payload),
            Disposition::Ignored(IgnoreReason::OriginMismatch)
        );
        assert!(!exchange.is_settled());

        // The genuine response still lands afterwards.
        match feed(&mut exchange, now, "https://lms.example", &payload) {
            Disposition::Settled(Ok(_)) => {},
            other => panic!("expected settle, got {other:?}"),
        }
    }

    #[test]
    fn wrong_subject_with_matching_id_is_ignored() {
        let (mut exchange, _, now) = open_put(OriginPolicy::Any);
        let payload = json!({
            "subject": "lti.get_data.response",
            "message_id": exchange.message_id().as_str(),
        });

        assert_eq!(
            feed(&mut exchange, now, "https://lms.example", &payload),
            Disposition::Ignored(IgnoreReason::SubjectMismatch)
        );
    }

    #[test]
    fn platform_error_settles_with_error_verbatim() {
        let (mut exchange, _, now) = open_put(OriginPolicy::Any);
        let payload = json!({
            "subject": "lti.put_data.response",
            "message_id": exchange.message_id().as_str(),
            "error": {"code": "storage_full", "message": "quota exceeded"},
        });

        match feed(&mut exchange, now, "https://lms.example", &payload) {
            Disposition::Settled(Err(ProtocolError::Platform { code, message })) => {
                assert_eq!(code, "storage_full");
                assert_eq!(message, "quota exceeded");
            },
            other => panic!("expected platform error, got {other:?}"),
        }
    }

    #[test]
    fn times_out_at_deadline_not_before() {
        let (mut exchange, _, now) = open_put(OriginPolicy::Any);

        assert!(exchange.poll_deadline(now).is_none());
        assert!(exchange.poll_deadline(now + Duration::from_millis(999)).is_none());

        match exchange.poll_deadline(now + DEFAULT_RESPONSE_TIMEOUT) {
            Some(Err(ProtocolError::Timeout { waited_ms })) => assert_eq!(waited_ms, 1000),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn arbitrary_message_ids_never_settle_an_exchange() {
        use proptest::prelude::*;

        // Real IDs are 28 characters ("message-" + 20 of base64url); nothing
        // shorter can collide, so every such delivery must be ignored.
        proptest!(|(id in "[a-zA-Z0-9_-]{0,27}")| {
            let (mut exchange, _, now) = open_put(OriginPolicy::Any);
            let payload = json!({"subject": "lti.put_data.response", "message_id": id});
            let disposition = feed(&mut exchange, now, "https://lms.example", &payload);
            prop_assert!(matches!(disposition, Disposition::Ignored(_)));
            prop_assert!(!exchange.is_settled());
        });
    }

    #[test]
    fn settles_exactly_once() {
        let (mut exchange, _, now) = open_put(OriginPolicy::Any);
        let payload = response_for(&exchange);

        assert!(matches!(
            feed(&mut exchange, now, "https://lms.example", &payload),
            Disposition::Settled(Ok(_))
        ));
        // Replays and late timeouts fall into the closed path.
        assert_eq!(
            feed(&mut exchange, now, "https://lms.example", &payload),
            Disposition::Ignored(IgnoreReason::Closed)
        );
        assert!(exchange.poll_deadline(now + Duration::from_secs(10)).is_none());
    }
}
