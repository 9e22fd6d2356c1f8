//! Capability-aware storage requests.
//!
//! A [`StorageRequest`] carries one put or get operation through the full
//! negotiation: probe the platform's capabilities, pick the advertised
//! spelling of the operation's subject, rewrite the outgoing message to that
//! exact spelling, target the advertised frame (if any), and run the data
//! exchange against the pinned platform origin.
//!
//! The machine is driven entirely by [`StorageRequest::handle_message`] and
//! [`StorageRequest::handle_tick`]; each step may yield follow-up posts and
//! eventually exactly one outcome.

use std::time::Instant;

use serde_json::Value;
use transom_proto::{
    CapabilityList, MessageId, RequestMessage, ResponseMessage, Subject, classify,
};

use crate::env::Environment;
use crate::error::ProtocolError;
use crate::exchange::{
    Disposition, Exchange, ExchangeConfig, FrameTarget, OriginPolicy, PostRequest, ResponsePayload,
};
use crate::probe::CapabilityProbe;

/// One storage operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    /// Store `value` under `key` in the platform window.
    Put {
        /// Storage key.
        key: String,
        /// Value to store.
        value: String,
    },
    /// Retrieve the value stored under `key`.
    Get {
        /// Storage key.
        key: String,
    },
}

impl StorageOp {
    /// The logical subject this operation requests.
    pub fn subject(&self) -> Subject {
        match self {
            Self::Put { .. } => Subject::PutData,
            Self::Get { .. } => Subject::GetData,
        }
    }

    fn into_request(self, message_id: MessageId) -> RequestMessage {
        match self {
            Self::Put { key, value } => RequestMessage::put_data(message_id, key, value),
            Self::Get { key } => RequestMessage::get_data(message_id, key),
        }
    }
}

/// Posts to deliver and, eventually, the final outcome of a request step.
#[derive(Debug)]
pub struct Step {
    /// Follow-up posts for the channel.
    pub posts: Vec<PostRequest>,
    /// Present exactly once, when the request settles.
    pub outcome: Option<Result<ResponseMessage, ProtocolError>>,
}

impl Step {
    fn none() -> Self {
        Self { posts: Vec::new(), outcome: None }
    }

    fn settled(outcome: Result<ResponseMessage, ProtocolError>) -> Self {
        Self { posts: Vec::new(), outcome: Some(outcome) }
    }
}

#[derive(Debug)]
enum Phase {
    Probing(CapabilityProbe),
    Sending(Exchange),
    Settled,
}

/// State machine for one capability-negotiated put/get.
#[derive(Debug)]
pub struct StorageRequest {
    op: Option<StorageOp>,
    data_id: MessageId,
    platform_origin: String,
    config: ExchangeConfig,
    debug: bool,
    phase: Phase,
}

impl StorageRequest {
    /// Open the request: fires the capability probe.
    ///
    /// `platform_origin` pins which origin the data response may come from;
    /// the probe itself runs unrestricted.
    pub fn open<E: Environment>(
        env: &E,
        op: StorageOp,
        platform_origin: impl Into<String>,
        config: ExchangeConfig,
        debug: bool,
    ) -> (Self, Vec<PostRequest>) {
        let now = env.now();
        let (probe, posts) =
            CapabilityProbe::open((env.message_id(), env.message_id()), now, &config, debug);

        let request = Self {
            op: Some(op),
            data_id: env.message_id(),
            platform_origin: platform_origin.into(),
            config,
            debug,
            phase: Phase::Probing(probe),
        };
        (request, posts)
    }

    /// Whether the request has settled.
    pub fn is_settled(&self) -> bool {
        matches!(self.phase, Phase::Settled)
    }

    /// Earliest pending deadline for the driver to sleep toward.
    pub fn next_deadline(&self) -> Option<Instant> {
        match &self.phase {
            Phase::Probing(probe) => probe.next_deadline(),
            Phase::Sending(exchange) if !exchange.is_settled() => Some(exchange.deadline()),
            Phase::Sending(_) | Phase::Settled => None,
        }
    }

    /// Feed one inbound window message.
    pub fn handle_message(&mut self, now: Instant, origin: &str, payload: &Value) -> Step {
        let incoming = classify(payload);

        match &mut self.phase {
            Phase::Probing(probe) => {
                match probe.handle_incoming(now, origin, &incoming, payload) {
                    Some(Ok(capabilities)) => self.begin_send(now, &capabilities),
                    Some(Err(error)) => {
                        self.phase = Phase::Settled;
                        Step::settled(Err(error))
                    },
                    None => Step::none(),
                }
            },
            Phase::Sending(exchange) => {
                match exchange.handle_incoming(now, origin, &incoming, payload) {
                    Disposition::Settled(result) => {
                        self.phase = Phase::Settled;
                        Step::settled(Self::finish(result))
                    },
                    Disposition::Ignored(reason) => {
                        tracing::trace!(target: "transom::request", ?reason, "message not consumed");
                        Step::none()
                    },
                }
            },
            Phase::Settled => Step::none(),
        }
    }

    /// Advance time; settles pending exchanges whose deadline has passed.
    pub fn handle_tick(&mut self, now: Instant) -> Step {
        match &mut self.phase {
            Phase::Probing(probe) => match probe.poll_deadline(now) {
                Some(Ok(capabilities)) => self.begin_send(now, &capabilities),
                Some(Err(error)) => {
                    self.phase = Phase::Settled;
                    Step::settled(Err(error))
                },
                None => Step::none(),
            },
            Phase::Sending(exchange) => match exchange.poll_deadline(now) {
                Some(result) => {
                    self.phase = Phase::Settled;
                    Step::settled(Self::finish(result))
                },
                None => Step::none(),
            },
            Phase::Settled => Step::none(),
        }
    }

    /// Transition from probing to the data exchange.
    fn begin_send(&mut self, now: Instant, capabilities: &CapabilityList) -> Step {
        let Some(op) = self.op.take() else {
            // The op is only taken here, and only once per request.
            self.phase = Phase::Settled;
            return Step::settled(Err(ProtocolError::not_found("Capabilities not found")));
        };

        let subject = op.subject();
        let Some(entry) = capabilities.find(subject) else {
            self.phase = Phase::Settled;
            return Step::settled(Err(ProtocolError::not_found("Capabilities not found")));
        };

        let mut request = op.into_request(self.data_id.clone());
        // Use the spelling the platform advertised, for compatibility with
        // both namespace vintages.
        request.subject = entry.subject.clone();
        let target = entry.frame.clone().map_or(FrameTarget::Launch, FrameTarget::Named);

        let (exchange, post) = Exchange::open(
            &request,
            target,
            OriginPolicy::Exact(self.platform_origin.clone()),
            now,
            &self.config,
            self.debug,
        );
        self.phase = Phase::Sending(exchange);
        Step { posts: vec![post], outcome: None }
    }

    fn finish(result: Result<ResponsePayload, ProtocolError>) -> Result<ResponseMessage, ProtocolError> {
        match result {
            Ok(ResponsePayload::Data(response)) => Ok(response),
            Ok(ResponsePayload::Capabilities(_)) => {
                // Unreachable through subject gating; fail closed.
                Err(ProtocolError::not_found("Capabilities not found"))
            },
            Err(error) => Err(error),
        }
    }
}
