//! Capability discovery.
//!
//! Platforms implement the capabilities query under one of two subjects:
//! the current `lti.capabilities` or the pre-release
//! `org.imsglobal.lti.capabilities`. The probe opens one exchange per
//! spelling, concurrently, against the launch window with an unrestricted
//! origin (the platform origin is not pinned until a platform answers).
//!
//! Resolution is first-success: the first exchange to settle with a payload
//! wins, and one spelling failing (timeout, platform error) while the other
//! is still pending does not fail the probe. Only when both have failed does
//! the probe fail, with the later error. The losing exchange is abandoned
//! unread — a posted window message cannot be withdrawn, so a late response
//! from the loser simply falls into the ignored path.

use std::time::Instant;

use serde_json::Value;
use transom_proto::{CapabilityList, Incoming, MessageId, RequestMessage};

use crate::error::ProtocolError;
use crate::exchange::{
    Disposition, Exchange, ExchangeConfig, FrameTarget, OriginPolicy, PostRequest, ResponsePayload,
};

/// Concurrent dual-subject capabilities query.
#[derive(Debug)]
pub struct CapabilityProbe {
    current: Exchange,
    legacy: Exchange,
    done: bool,
}

impl CapabilityProbe {
    /// Open both probe exchanges.
    ///
    /// Each spelling gets its own fresh message ID; both posts target the
    /// launch window with origin `*`.
    pub fn open(
        ids: (MessageId, MessageId),
        now: Instant,
        config: &ExchangeConfig,
        debug: bool,
    ) -> (Self, Vec<PostRequest>) {
        let (current, current_post) = Exchange::open(
            &RequestMessage::capabilities(ids.0),
            FrameTarget::Launch,
            OriginPolicy::Any,
            now,
            config,
            debug,
        );
        let (legacy, legacy_post) = Exchange::open(
            &RequestMessage::capabilities_legacy(ids.1),
            FrameTarget::Launch,
            OriginPolicy::Any,
            now,
            config,
            debug,
        );

        (Self { current, legacy, done: false }, vec![current_post, legacy_post])
    }

    /// Whether the probe has resolved (either way).
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Earliest pending deadline, if any exchange is still waiting.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.done {
            return None;
        }
        let pending = [&self.current, &self.legacy];
        pending
            .into_iter()
            .filter(|exchange| !exchange.is_settled())
            .map(Exchange::deadline)
            .min()
    }

    /// Feed one classified inbound message.
    pub fn handle_incoming(
        &mut self,
        now: Instant,
        origin: &str,
        incoming: &Incoming,
        raw: &Value,
    ) -> Option<Result<CapabilityList, ProtocolError>> {
        if self.done {
            return None;
        }

        match self.current.handle_incoming(now, origin, incoming, raw) {
            Disposition::Settled(result) => {
                let other_pending = !self.legacy.is_settled();
                return self.resolve(result, other_pending);
            },
            Disposition::Ignored(_) => {},
        }
        match self.legacy.handle_incoming(now, origin, incoming, raw) {
            Disposition::Settled(result) => {
                let other_pending = !self.current.is_settled();
                self.resolve(result, other_pending)
            },
            Disposition::Ignored(_) => None,
        }
    }

    /// Settle timed-out exchanges.
    pub fn poll_deadline(&mut self, now: Instant) -> Option<Result<CapabilityList, ProtocolError>> {
        if self.done {
            return None;
        }

        if let Some(result) = self.current.poll_deadline(now) {
            let other_pending = !self.legacy.is_settled();
            if let Some(outcome) = self.resolve(result, other_pending) {
                return Some(outcome);
            }
        }
        if let Some(result) = self.legacy.poll_deadline(now) {
            let other_pending = !self.current.is_settled();
            return self.resolve(result, other_pending);
        }
        None
    }

    fn resolve(
        &mut self,
        result: Result<ResponsePayload, ProtocolError>,
        other_pending: bool,
    ) -> Option<Result<CapabilityList, ProtocolError>> {
        match result {
            Ok(payload) => {
                self.done = true;
                Some(Self::accept(payload))
            },
            Err(error) if other_pending => {
                // First-success semantics: one spelling failing must not
                // fail the probe while the other is outstanding.
                tracing::debug!(target: "transom::probe", %error, "probe leg failed, other pending");
                None
            },
            Err(error) => {
                self.done = true;
                Some(Err(error))
            },
        }
    }

    fn accept(payload: ResponsePayload) -> Result<CapabilityList, ProtocolError> {
        match payload {
            ResponsePayload::Capabilities(capabilities) => {
                capabilities.supported_messages.map_or_else(
                    || Err(ProtocolError::not_found("No capabilities")),
                    |supported_messages| Ok(CapabilityList { supported_messages }),
                )
            },
            ResponsePayload::Data(_) => {
                // Subject gating keeps data responses out of a capabilities
                // exchange; a platform that answers here anyway advertises
                // nothing usable.
                Err(ProtocolError::not_found("No capabilities"))
            },
        }
    }
}
